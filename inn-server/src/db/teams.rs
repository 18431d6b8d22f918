//! Team registration, lookup and score updates

use serde::Deserialize;
use sqlx::SqlitePool;

use inn_common::api::hash_password;
use inn_common::db::{Round, Team};
use inn_common::questions::MAX_ROUND_SCORE;
use inn_common::time::now_rfc3339;
use inn_common::{Error, Result};

/// Input for creating a team
#[derive(Debug, Clone, Deserialize)]
pub struct NewTeam {
    /// Explicit id (admin only); generated when absent
    pub team_id: Option<String>,
    pub team_name: String,
    pub member1: String,
    pub member2: Option<String>,
    pub password: String,
}

impl NewTeam {
    /// Trim fields and check lengths
    pub fn validate(&self) -> Result<()> {
        let name_len = self.team_name.trim().chars().count();
        if !(3..=50).contains(&name_len) {
            return Err(Error::InvalidInput(
                "team_name must be between 3 and 50 characters".into(),
            ));
        }
        if self.member1.trim().is_empty() {
            return Err(Error::InvalidInput("member1 is required".into()));
        }
        if self.password.chars().count() < 6 {
            return Err(Error::InvalidInput(
                "password must be at least 6 characters".into(),
            ));
        }
        if let Some(id) = &self.team_id {
            let id = id.trim();
            if id.is_empty()
                || id.len() > 32
                || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(Error::InvalidInput(
                    "team_id may only contain letters, digits, '-' and '_' (max 32)".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Check a round score against the allowed range [0, 99]
pub fn validate_round_score(score: f64) -> Result<f64> {
    if !score.is_finite() || !(0.0..=MAX_ROUND_SCORE).contains(&score) {
        return Err(Error::InvalidInput(format!(
            "score must be between 0 and {}",
            MAX_ROUND_SCORE
        )));
    }
    Ok(score)
}

/// Insert a team; duplicate id or name is a `Conflict`
pub async fn create_team(pool: &SqlitePool, new_team: &NewTeam) -> Result<Team> {
    new_team.validate()?;

    let team_name = new_team.team_name.trim();
    if find_by_name(pool, team_name).await?.is_some() {
        return Err(Error::Conflict(format!(
            "Team name '{}' is already taken",
            team_name
        )));
    }

    let explicit_id = match &new_team.team_id {
        Some(id) => {
            let id = id.trim().to_string();
            if get_team(pool, &id).await?.is_some() {
                return Err(Error::Conflict(format!("Team id '{}' already exists", id)));
            }
            Some(id)
        }
        None => None,
    };

    let password = hash_password(&new_team.password);
    let now = now_rfc3339();
    let member2 = new_team
        .member2
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    // Generated ids are allocated inside the INSERT, under its write lock
    let sql = format!(
        r#"
        INSERT INTO teams (
            team_id, team_name, member1, member2, password_hash, password_salt,
            created_at, updated_at
        ) VALUES (COALESCE(?1, ({})), ?2, ?3, ?4, ?5, ?6, ?7, ?7)
        RETURNING team_id
        "#,
        NEXT_TEAM_ID_SQL
    );
    let team_id: String = sqlx::query_scalar(&sql)
        .bind(explicit_id)
        .bind(team_name)
        .bind(new_team.member1.trim())
        .bind(member2)
        .bind(&password.hash)
        .bind(&password.salt)
        .bind(&now)
        .fetch_one(pool)
        .await
        .map_err(|e| Error::from_insert(e, "Team name or id"))?;

    get_team(pool, &team_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("Team {} vanished after insert", team_id)))
}

/// Next free `INN-NNNN` id, as a scalar subquery
const NEXT_TEAM_ID_SQL: &str = "SELECT printf('INN-%04d', COALESCE(MAX(CAST(SUBSTR(team_id, 5) AS INTEGER)), 0) + 1) \
     FROM teams WHERE team_id GLOB 'INN-[0-9]*'";

pub async fn get_team(pool: &SqlitePool, team_id: &str) -> Result<Option<Team>> {
    let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE team_id = ?")
        .bind(team_id)
        .fetch_optional(pool)
        .await?;
    Ok(team)
}

/// Like `get_team` but missing teams are `NotFound`
pub async fn require_team(pool: &SqlitePool, team_id: &str) -> Result<Team> {
    get_team(pool, team_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Team '{}' not found", team_id)))
}

/// Case-insensitive lookup by name
pub async fn find_by_name(pool: &SqlitePool, team_name: &str) -> Result<Option<Team>> {
    let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE team_name = ? COLLATE NOCASE")
        .bind(team_name.trim())
        .fetch_optional(pool)
        .await?;
    Ok(team)
}

pub async fn list_teams(pool: &SqlitePool) -> Result<Vec<Team>> {
    let teams = sqlx::query_as::<_, Team>("SELECT * FROM teams ORDER BY team_id")
        .fetch_all(pool)
        .await?;
    Ok(teams)
}

/// Admin-assigned round score; marks the round as submitted
pub async fn set_round_score(
    pool: &SqlitePool,
    team_id: &str,
    round: Round,
    score: f64,
) -> Result<Team> {
    let score = validate_round_score(score)?;
    let prefix = round.column_prefix();

    let sql = format!(
        "UPDATE teams SET {p}_score = ?, {p}_submitted = 1, updated_at = ? WHERE team_id = ?",
        p = prefix
    );
    let result = sqlx::query(&sql)
        .bind(score)
        .bind(now_rfc3339())
        .bind(team_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Team '{}' not found", team_id)));
    }

    require_team(pool, team_id).await
}

/// Delete a team and (by cascade) its submissions, evaluations and uploads
pub async fn delete_team(pool: &SqlitePool, team_id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM teams WHERE team_id = ?")
        .bind(team_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Team '{}' not found", team_id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inn_common::db::init_memory_database;

    fn new_team(name: &str) -> NewTeam {
        NewTeam {
            team_id: None,
            team_name: name.to_string(),
            member1: "Ada".to_string(),
            member2: Some("  ".to_string()),
            password: "secret1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generated_ids_are_sequential() {
        let pool = init_memory_database().await.unwrap();

        let first = create_team(&pool, &new_team("Alpha")).await.unwrap();
        let second = create_team(&pool, &new_team("Beta")).await.unwrap();

        assert_eq!(first.team_id, "INN-0001");
        assert_eq!(second.team_id, "INN-0002");
        assert_eq!(first.member2, None, "blank member2 is stored as NULL");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_get_distinct_ids() {
        let dir = tempfile::TempDir::new().unwrap();
        let pool = inn_common::db::init_database(&dir.path().join("inn.db"))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = pool.clone();
                let team = new_team(&format!("Team {}", i));
                tokio::spawn(async move { create_team(&pool, &team).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().team_id);
        }
        ids.sort();

        let expected: Vec<String> = (1..=8).map(|n| format!("INN-{:04}", n)).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_generated_id_follows_explicit_inn_id() {
        let pool = init_memory_database().await.unwrap();
        let mut team = new_team("Alpha");
        team.team_id = Some("INN-0041".into());
        create_team(&pool, &team).await.unwrap();

        let next = create_team(&pool, &new_team("Beta")).await.unwrap();
        assert_eq!(next.team_id, "INN-0042");
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() {
        let pool = init_memory_database().await.unwrap();
        create_team(&pool, &new_team("Alpha")).await.unwrap();

        let err = create_team(&pool, &new_team("  ALPHA ")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_explicit_id_is_conflict() {
        let pool = init_memory_database().await.unwrap();
        let mut team = new_team("Alpha");
        team.team_id = Some("T-1".into());
        create_team(&pool, &team).await.unwrap();

        let mut other = new_team("Beta");
        other.team_id = Some("T-1".into());
        let err = create_team(&pool, &other).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let pool = init_memory_database().await.unwrap();
        let team = create_team(&pool, &new_team("Alpha")).await.unwrap();

        assert_ne!(team.password_hash, "secret1");
        assert!(inn_common::api::verify_password(
            "secret1",
            &team.password_salt,
            &team.password_hash
        ));
    }

    #[test]
    fn test_validation() {
        assert!(new_team("ab").validate().is_err());
        assert!(new_team(&"x".repeat(51)).validate().is_err());

        let mut short_password = new_team("Alpha");
        short_password.password = "12345".into();
        assert!(short_password.validate().is_err());

        let mut bad_id = new_team("Alpha");
        bad_id.team_id = Some("drop table;".into());
        assert!(bad_id.validate().is_err());
    }

    #[test]
    fn test_validate_round_score_bounds() {
        assert!(validate_round_score(0.0).is_ok());
        assert!(validate_round_score(99.0).is_ok());
        assert!(validate_round_score(-0.5).is_err());
        assert!(validate_round_score(99.5).is_err());
        assert!(validate_round_score(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_set_round_score_and_delete() {
        let pool = init_memory_database().await.unwrap();
        let team = create_team(&pool, &new_team("Alpha")).await.unwrap();

        let updated = set_round_score(&pool, &team.team_id, Round::Programming, 42.0)
            .await
            .unwrap();
        assert_eq!(updated.round3_score, Some(42.0));
        assert!(updated.round3_submitted);

        let err = set_round_score(&pool, "INN-9999", Round::Programming, 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        delete_team(&pool, &team.team_id).await.unwrap();
        assert!(get_team(&pool, &team.team_id).await.unwrap().is_none());
        assert!(matches!(
            delete_team(&pool, &team.team_id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }
}
