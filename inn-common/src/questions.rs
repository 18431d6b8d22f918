//! Contest question bank
//!
//! Round 1 (algorithmic reasoning) and round 2 (debugging) questions are
//! graded per answer; round 3 lists external competitive programming
//! problems whose total the team reports itself.

use serde::Serialize;

use crate::db::Round;

/// A graded question of round 1 or round 2
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub round: Round,
    pub title: &'static str,
    /// Problem statement (round 1) or buggy snippet with its intent (round 2)
    pub prompt: &'static str,
    /// Reference approach or expected fix; never shown to contestants
    pub reference: &'static str,
    pub rubric: &'static str,
    pub max_points: f64,
}

/// Contestant-facing view of a question
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: &'static str,
    pub title: &'static str,
    pub prompt: &'static str,
    pub max_points: f64,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            title: q.title,
            prompt: q.prompt,
            max_points: q.max_points,
        }
    }
}

/// Round 3 problem on an external judge
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    pub id: &'static str,
    pub title: &'static str,
    pub url: &'static str,
    pub points: f64,
}

/// Highest score a team can hold for any round
pub const MAX_ROUND_SCORE: f64 = 99.0;

static ROUND1: &[Question] = &[
    Question {
        id: "r1q1",
        round: Round::Reasoning,
        title: "Two-Sum Without Extra Space",
        prompt: "Given a sorted array of n integers and a target T, describe an algorithm \
                 that decides whether two distinct elements sum to T using O(1) extra space. \
                 State its time complexity and argue why it never misses a valid pair.",
        reference: "Two pointers at both ends; move the left pointer right when the sum is \
                    too small and the right pointer left when too large. O(n) time, O(1) \
                    space. Correct because each move discards a value that cannot be part \
                    of any remaining valid pair.",
        rubric: "4 points two-pointer idea, 3 points O(n)/O(1) analysis, 3 points \
                 correctness argument.",
        max_points: 10.0,
    },
    Question {
        id: "r1q2",
        round: Round::Reasoning,
        title: "Staircase Ways",
        prompt: "A runner climbs a staircase of n steps taking 1, 2 or 3 steps at a time. \
                 How many distinct ways are there to reach the top? Give a recurrence, the \
                 value for n = 6, and the complexity of computing it.",
        reference: "f(n) = f(n-1) + f(n-2) + f(n-3), f(0) = 1, f(1) = 1, f(2) = 2. \
                    f(6) = 24. O(n) time with O(1) space by keeping the last three values.",
        rubric: "4 points recurrence with base cases, 3 points f(6) = 24, 3 points \
                 complexity.",
        max_points: 10.0,
    },
    Question {
        id: "r1q3",
        round: Round::Reasoning,
        title: "Cycle in a Linked List",
        prompt: "Explain how to detect whether a singly linked list contains a cycle and \
                 how to find the node where the cycle begins, without modifying the list \
                 and using constant memory.",
        reference: "Floyd's tortoise and hare: slow moves 1, fast moves 2; they meet iff a \
                    cycle exists. Reset one pointer to head and advance both by 1; they \
                    meet at the cycle entry. O(n) time, O(1) space.",
        rubric: "4 points detection, 4 points entry-node step with justification, 2 points \
                 complexity.",
        max_points: 10.0,
    },
    Question {
        id: "r1q4",
        round: Round::Reasoning,
        title: "Meeting Rooms",
        prompt: "Given n meetings as [start, end) intervals, compute the minimum number of \
                 rooms needed so that no two overlapping meetings share a room. Describe \
                 the algorithm and its complexity.",
        reference: "Sort start and end times separately and sweep, incrementing on a start \
                    and decrementing on an end that is <= the current start; the maximum \
                    counter is the answer. Alternatively a min-heap of end times. \
                    O(n log n).",
        rubric: "5 points correct sweep or heap approach, 3 points handling of touching \
                 intervals, 2 points complexity.",
        max_points: 10.0,
    },
    Question {
        id: "r1q5",
        round: Round::Reasoning,
        title: "Missing Number",
        prompt: "An array holds n distinct numbers taken from 0..=n, so exactly one is \
                 missing. Find it in O(n) time and O(1) extra space, and explain why your \
                 method cannot overflow or can be made not to.",
        reference: "XOR all indices 0..=n with all values; the result is the missing \
                    number. Summation n(n+1)/2 minus the sum also works but can overflow \
                    for fixed-width integers unless computed incrementally or with wider \
                    types.",
        rubric: "5 points XOR or sum approach, 3 points overflow discussion, 2 points \
                 complexity.",
        max_points: 10.0,
    },
];

static ROUND2: &[Question] = &[
    Question {
        id: "r2q1",
        round: Round::Debugging,
        title: "Off-by-One Binary Search",
        prompt: "The function should return the index of x in the sorted slice or -1.\n\n\
                 int search(int a[], int n, int x) {\n\
                 \x20   int lo = 0, hi = n;\n\
                 \x20   while (lo <= hi) {\n\
                 \x20       int mid = (lo + hi) / 2;\n\
                 \x20       if (a[mid] == x) return mid;\n\
                 \x20       if (a[mid] < x) lo = mid; else hi = mid - 1;\n\
                 \x20   }\n\
                 \x20   return -1;\n\
                 }\n\n\
                 Identify every bug and give the corrected code.",
        reference: "hi must start at n - 1 (a[n] is out of bounds); lo = mid must be \
                    lo = mid + 1 (infinite loop); mid should be lo + (hi - lo) / 2 to \
                    avoid overflow.",
        rubric: "5 points bounds fix, 5 points infinite-loop fix, 3 points overflow-safe \
                 midpoint, 2 points working corrected code.",
        max_points: 15.0,
    },
    Question {
        id: "r2q2",
        round: Round::Debugging,
        title: "Leaky Reverse",
        prompt: "The function should reverse a singly linked list in place.\n\n\
                 Node* reverse(Node* head) {\n\
                 \x20   Node* prev = NULL;\n\
                 \x20   while (head) {\n\
                 \x20       head->next = prev;\n\
                 \x20       prev = head;\n\
                 \x20       head = head->next;\n\
                 \x20   }\n\
                 \x20   return head;\n\
                 }\n\n\
                 Identify every bug and give the corrected code.",
        reference: "The next pointer is overwritten before it is saved, so the loop \
                    stops after one node; save next = head->next first. The function \
                    returns head (NULL) instead of prev.",
        rubric: "7 points saving next before relinking, 5 points returning prev, 3 points \
                 working corrected code.",
        max_points: 15.0,
    },
    Question {
        id: "r2q3",
        round: Round::Debugging,
        title: "Average of Scores",
        prompt: "The function should return the average of the scores as a floating point \
                 value.\n\n\
                 def average(scores):\n\
                 \x20   total = 0\n\
                 \x20   for i in range(1, len(scores)):\n\
                 \x20       total += scores[i]\n\
                 \x20   return total // len(scores)\n\n\
                 Identify every bug and give the corrected code.",
        reference: "The loop skips index 0; floor division // truncates, use /; an empty \
                    list divides by zero and must be handled.",
        rubric: "5 points loop range, 5 points true division, 3 points empty input, \
                 2 points working corrected code.",
        max_points: 15.0,
    },
    Question {
        id: "r2q4",
        round: Round::Debugging,
        title: "Shared Counter",
        prompt: "Two threads each call increment() 1,000,000 times, yet the final count is \
                 usually below 2,000,000.\n\n\
                 static int count = 0;\n\
                 void increment() { count = count + 1; }\n\n\
                 Explain the bug and give a corrected version.",
        reference: "count = count + 1 is a non-atomic read-modify-write, so concurrent \
                    updates are lost. Use an atomic increment or guard the update with a \
                    mutex.",
        rubric: "7 points identifying the data race, 6 points a correct atomic or locked \
                 fix, 2 points explanation of lost updates.",
        max_points: 15.0,
    },
];

static ROUND3: &[Problem] = &[
    Problem {
        id: "r3p1",
        title: "Warm-up: Array Rotation",
        url: "https://codeforces.com/problemset/problem/1/A",
        points: 15.0,
    },
    Problem {
        id: "r3p2",
        title: "Greedy Scheduling",
        url: "https://codeforces.com/problemset/problem/4/A",
        points: 20.0,
    },
    Problem {
        id: "r3p3",
        title: "Shortest Paths on a Grid",
        url: "https://codeforces.com/problemset/problem/20/C",
        points: 30.0,
    },
    Problem {
        id: "r3p4",
        title: "Segment Sums",
        url: "https://codeforces.com/problemset/problem/339/D",
        points: 34.0,
    },
];

/// Graded questions of a round; empty for round 3
pub fn questions_for(round: Round) -> &'static [Question] {
    match round {
        Round::Reasoning => ROUND1,
        Round::Debugging => ROUND2,
        Round::Programming => &[],
    }
}

/// Look up a graded question by round and id
pub fn find_question(round: Round, id: &str) -> Option<&'static Question> {
    questions_for(round).iter().find(|q| q.id == id)
}

/// Round 3 problem set
pub fn problems() -> &'static [Problem] {
    ROUND3
}
