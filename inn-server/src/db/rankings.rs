//! Leaderboard computation
//!
//! Ranks use standard competition ranking (1, 2, 2, 4). Teams without a
//! score get no rank and are listed after every ranked team.

use serde::Serialize;
use sqlx::SqlitePool;
use std::cmp::Ordering;
use std::str::FromStr;

use inn_common::db::{Round, Team};
use inn_common::time::now_rfc3339;
use inn_common::Result;

use super::teams::list_teams;

/// Which leaderboard to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingScope {
    Round(Round),
    Overall,
}

impl FromStr for RankingScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "overall" => Ok(RankingScope::Overall),
            other => other
                .parse::<i64>()
                .map_err(|_| format!("Invalid round '{}' (expected 1, 2, 3 or overall)", s))
                .and_then(Round::try_from)
                .map(RankingScope::Round),
        }
    }
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub rank: Option<i64>,
    pub team_id: String,
    pub team_name: String,
    pub score: Option<f64>,
}

/// Competition ranks for `scores`, in input order
///
/// Higher scores rank first; equal scores share a rank and the next rank
/// skips accordingly. `None` scores get `None`.
pub fn competition_ranks(scores: &[Option<f64>]) -> Vec<Option<i64>> {
    let mut order: Vec<usize> = (0..scores.len()).filter(|&i| scores[i].is_some()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (scores[a].unwrap_or(0.0), scores[b].unwrap_or(0.0));
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });

    let mut ranks = vec![None; scores.len()];
    let mut previous: Option<(f64, i64)> = None;
    for (position, &index) in order.iter().enumerate() {
        let score = scores[index].unwrap_or(0.0);
        let rank = match previous {
            Some((prev_score, prev_rank)) if prev_score == score => prev_rank,
            _ => position as i64 + 1,
        };
        ranks[index] = Some(rank);
        previous = Some((score, rank));
    }
    ranks
}

/// Recompute every rank column from the current scores
pub async fn compute_rankings(pool: &SqlitePool) -> Result<usize> {
    let teams = list_teams(pool).await?;

    let mut per_round = Vec::with_capacity(Round::ALL.len());
    for round in Round::ALL {
        let scores: Vec<Option<f64>> = teams.iter().map(|t| t.score(round)).collect();
        per_round.push(competition_ranks(&scores));
    }
    let totals: Vec<Option<f64>> = teams.iter().map(Team::total_score).collect();
    let overall = competition_ranks(&totals);

    let now = now_rfc3339();
    let mut tx = pool.begin().await?;
    for (i, team) in teams.iter().enumerate() {
        sqlx::query(
            r#"
            UPDATE teams
            SET round1_rank = ?, round2_rank = ?, round3_rank = ?, overall_rank = ?, updated_at = ?
            WHERE team_id = ?
            "#,
        )
        .bind(per_round[0][i])
        .bind(per_round[1][i])
        .bind(per_round[2][i])
        .bind(overall[i])
        .bind(&now)
        .bind(&team.team_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(teams.len())
}

/// Leaderboard ordered by rank ascending, unranked last, ties by team id
pub async fn list_rankings(pool: &SqlitePool, scope: RankingScope) -> Result<Vec<RankingEntry>> {
    let teams = list_teams(pool).await?;

    let mut entries: Vec<RankingEntry> = teams
        .into_iter()
        .map(|team| {
            let (rank, score) = match scope {
                RankingScope::Round(round) => (team.rank(round), team.score(round)),
                RankingScope::Overall => (team.overall_rank, team.total_score()),
            };
            RankingEntry {
                rank,
                team_id: team.team_id,
                team_name: team.team_name,
                score,
            }
        })
        .collect();

    sort_entries(&mut entries);
    Ok(entries)
}

fn sort_entries(entries: &mut [RankingEntry]) {
    entries.sort_by(|a, b| match (a.rank, b.rank) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.team_id.cmp(&b.team_id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.team_id.cmp(&b.team_id),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::teams::{create_team, set_round_score, NewTeam};
    use inn_common::db::init_memory_database;

    #[test]
    fn test_competition_ranks() {
        let ranks = competition_ranks(&[Some(50.0), None, Some(80.0), Some(50.0), Some(10.0)]);
        assert_eq!(ranks, vec![Some(2), None, Some(1), Some(2), Some(4)]);
    }

    #[test]
    fn test_competition_ranks_empty_and_all_none() {
        assert!(competition_ranks(&[]).is_empty());
        assert_eq!(competition_ranks(&[None, None]), vec![None, None]);
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("overall".parse::<RankingScope>(), Ok(RankingScope::Overall));
        assert_eq!("".parse::<RankingScope>(), Ok(RankingScope::Overall));
        assert_eq!("2".parse::<RankingScope>(), Ok(RankingScope::Round(Round::Debugging)));
        assert!("4".parse::<RankingScope>().is_err());
        assert!("abc".parse::<RankingScope>().is_err());
    }

    #[test]
    fn test_sort_nulls_last_then_team_id() {
        let entry = |rank, id: &str| RankingEntry {
            rank,
            team_id: id.into(),
            team_name: id.into(),
            score: None,
        };
        let mut entries = vec![
            entry(None, "A"),
            entry(Some(2), "D"),
            entry(Some(1), "C"),
            entry(Some(2), "B"),
        ];
        sort_entries(&mut entries);
        let ids: Vec<_> = entries.iter().map(|e| e.team_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "B", "D", "A"]);
    }

    #[tokio::test]
    async fn test_compute_and_list() {
        let pool = init_memory_database().await.unwrap();
        for name in ["Alpha", "Bravo", "Charlie"] {
            create_team(
                &pool,
                &NewTeam {
                    team_id: None,
                    team_name: name.into(),
                    member1: "m".into(),
                    member2: None,
                    password: "secret1".into(),
                },
            )
            .await
            .unwrap();
        }
        set_round_score(&pool, "INN-0001", Round::Reasoning, 30.0).await.unwrap();
        set_round_score(&pool, "INN-0002", Round::Reasoning, 45.0).await.unwrap();
        set_round_score(&pool, "INN-0001", Round::Debugging, 40.0).await.unwrap();

        assert_eq!(compute_rankings(&pool).await.unwrap(), 3);

        let round1 = list_rankings(&pool, RankingScope::Round(Round::Reasoning))
            .await
            .unwrap();
        let summary: Vec<_> = round1.iter().map(|e| (e.team_id.as_str(), e.rank)).collect();
        assert_eq!(
            summary,
            vec![("INN-0002", Some(1)), ("INN-0001", Some(2)), ("INN-0003", None)]
        );

        let overall = list_rankings(&pool, RankingScope::Overall).await.unwrap();
        assert_eq!(overall[0].team_id, "INN-0001");
        assert_eq!(overall[0].score, Some(70.0));
        assert_eq!(overall[2].rank, None);

        for round in Round::ALL {
            let rows = list_rankings(&pool, RankingScope::Round(round)).await.unwrap();
            let mut seen_none = false;
            for row in rows {
                if row.rank.is_none() {
                    seen_none = true;
                } else {
                    assert!(!seen_none, "ranked row after unranked row");
                }
            }
        }
    }
}
