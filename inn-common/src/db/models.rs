//! Database models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contest round
///
/// Serialized as its number (1, 2, 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Round {
    /// Round 1: algorithmic reasoning
    Reasoning,
    /// Round 2: debugging
    Debugging,
    /// Round 3: competitive programming
    Programming,
}

impl Round {
    pub const ALL: [Round; 3] = [Round::Reasoning, Round::Debugging, Round::Programming];

    pub fn number(self) -> i64 {
        match self {
            Round::Reasoning => 1,
            Round::Debugging => 2,
            Round::Programming => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Round::Reasoning => "Algorithmic Reasoning",
            Round::Debugging => "Debugging",
            Round::Programming => "Competitive Programming",
        }
    }

    /// Whether answers for this round are graded per question
    pub fn is_ai_graded(self) -> bool {
        matches!(self, Round::Reasoning | Round::Debugging)
    }

    /// Column prefix used by the teams table (`round1_score`, ...)
    pub fn column_prefix(self) -> &'static str {
        match self {
            Round::Reasoning => "round1",
            Round::Debugging => "round2",
            Round::Programming => "round3",
        }
    }
}

impl TryFrom<i64> for Round {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Round::Reasoning),
            2 => Ok(Round::Debugging),
            3 => Ok(Round::Programming),
            other => Err(format!("Round must be 1, 2 or 3 (got {})", other)),
        }
    }
}

impl From<Round> for i64 {
    fn from(round: Round) -> Self {
        round.number()
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Round lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RoundStatus {
    Pending,
    Active,
    Completed,
}

impl RoundStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Active => "active",
            RoundStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoundStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RoundStatus::Pending),
            "active" => Ok(RoundStatus::Active),
            "completed" => Ok(RoundStatus::Completed),
            other => Err(format!(
                "Invalid status '{}' (expected pending, active or completed)",
                other
            )),
        }
    }
}

/// Evaluation record lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum EvaluationStatus {
    /// Waiting for AI grading
    Pending,
    /// Graded by the model
    Completed,
    /// Model output unusable; scored 0 until an admin reviews it
    Failed,
    /// Score set by an admin
    Overridden,
}

impl EvaluationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationStatus::Pending => "pending",
            EvaluationStatus::Completed => "completed",
            EvaluationStatus::Failed => "failed",
            EvaluationStatus::Overridden => "overridden",
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EvaluationStatus::Pending),
            "completed" => Ok(EvaluationStatus::Completed),
            "failed" => Ok(EvaluationStatus::Failed),
            "overridden" => Ok(EvaluationStatus::Overridden),
            other => Err(format!("Invalid evaluation status '{}'", other)),
        }
    }
}

/// AI grading job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `teams` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub team_id: String,
    pub team_name: String,
    pub member1: String,
    pub member2: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub password_salt: String,
    pub round1_score: Option<f64>,
    pub round2_score: Option<f64>,
    pub round3_score: Option<f64>,
    pub round1_submitted: bool,
    pub round2_submitted: bool,
    pub round3_submitted: bool,
    pub round1_rank: Option<i64>,
    pub round2_rank: Option<i64>,
    pub round3_rank: Option<i64>,
    pub overall_rank: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl Team {
    pub fn score(&self, round: Round) -> Option<f64> {
        match round {
            Round::Reasoning => self.round1_score,
            Round::Debugging => self.round2_score,
            Round::Programming => self.round3_score,
        }
    }

    pub fn submitted(&self, round: Round) -> bool {
        match round {
            Round::Reasoning => self.round1_submitted,
            Round::Debugging => self.round2_submitted,
            Round::Programming => self.round3_submitted,
        }
    }

    pub fn rank(&self, round: Round) -> Option<i64> {
        match round {
            Round::Reasoning => self.round1_rank,
            Round::Debugging => self.round2_rank,
            Round::Programming => self.round3_rank,
        }
    }

    /// Sum of the recorded round scores, `None` when no round is scored
    pub fn total_score(&self) -> Option<f64> {
        let scores: Vec<f64> = Round::ALL.iter().filter_map(|r| self.score(*r)).collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum())
        }
    }
}

/// Row of the `rounds` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RoundState {
    pub round_number: i64,
    pub name: String,
    pub status: RoundStatus,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
}

impl RoundState {
    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }
}

/// Row of `submissions_round1` / `submissions_round2`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Submission {
    pub id: String,
    pub team_id: String,
    pub question_id: String,
    pub answer: String,
    pub submitted_at: String,
}

/// Row of the `evaluation` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Evaluation {
    pub id: String,
    pub team_id: String,
    pub round_number: i64,
    pub question_id: String,
    pub answer: String,
    pub status: EvaluationStatus,
    pub ai_score: Option<f64>,
    pub ai_analysis: Option<String>,
    pub admin_score: Option<f64>,
    pub admin_notes: Option<String>,
    pub final_score: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Row of the `ai_jobs` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AiJob {
    pub id: String,
    pub round_number: i64,
    pub status: JobStatus,
    pub total: i64,
    pub succeeded: i64,
    pub failed: i64,
    pub error: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

/// The single row of the `telecast` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Telecast {
    pub active: bool,
    pub video_url: Option<String>,
    pub message: Option<String>,
    pub started_at: Option<String>,
    pub updated_at: String,
}

/// Team that acknowledged the current telecast
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TelecastViewer {
    pub team_id: String,
    pub team_name: String,
    pub acknowledged_at: String,
}

/// Row of the `uploads` table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Upload {
    pub id: String,
    pub team_id: String,
    pub kind: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing, default)]
    pub stored_path: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_try_from() {
        assert_eq!(Round::try_from(1).unwrap(), Round::Reasoning);
        assert_eq!(Round::try_from(3).unwrap(), Round::Programming);
        assert!(Round::try_from(0).is_err());
        assert!(Round::try_from(4).is_err());
    }

    #[test]
    fn test_round_serde_as_number() {
        let json = serde_json::to_string(&Round::Debugging).unwrap();
        assert_eq!(json, "2");
        let round: Round = serde_json::from_str("3").unwrap();
        assert_eq!(round, Round::Programming);
        assert!(serde_json::from_str::<Round>("7").is_err());
    }

    #[test]
    fn test_round_status_parse() {
        assert_eq!("active".parse::<RoundStatus>().unwrap(), RoundStatus::Active);
        assert!("running".parse::<RoundStatus>().is_err());
        assert_eq!(RoundStatus::Completed.as_str(), "completed");
    }

    #[test]
    fn test_team_total_score_ignores_missing_rounds() {
        let mut team = Team {
            team_id: "INN-0001".into(),
            team_name: "Alpha".into(),
            member1: "a".into(),
            member2: None,
            password_hash: String::new(),
            password_salt: String::new(),
            round1_score: None,
            round2_score: None,
            round3_score: None,
            round1_submitted: false,
            round2_submitted: false,
            round3_submitted: false,
            round1_rank: None,
            round2_rank: None,
            round3_rank: None,
            overall_rank: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(team.total_score(), None);

        team.round1_score = Some(40.0);
        team.round3_score = Some(12.5);
        assert_eq!(team.total_score(), Some(52.5));
    }
}
