//! Round lifecycle

use sqlx::SqlitePool;

use inn_common::db::{Round, RoundState, RoundStatus};
use inn_common::time::now_rfc3339;
use inn_common::{Error, Result};

pub async fn list_rounds(pool: &SqlitePool) -> Result<Vec<RoundState>> {
    let rounds = sqlx::query_as::<_, RoundState>("SELECT * FROM rounds ORDER BY round_number")
        .fetch_all(pool)
        .await?;
    Ok(rounds)
}

pub async fn get_round(pool: &SqlitePool, round: Round) -> Result<RoundState> {
    sqlx::query_as::<_, RoundState>("SELECT * FROM rounds WHERE round_number = ?")
        .bind(round.number())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Round {} not found", round)))
}

/// Change a round's status
///
/// Activating stamps `started_at` and clears `ended_at`; completing stamps
/// `ended_at`. Moving back to pending clears both.
pub async fn set_round_status(
    pool: &SqlitePool,
    round: Round,
    status: RoundStatus,
) -> Result<RoundState> {
    let sql = match status {
        RoundStatus::Active => {
            "UPDATE rounds SET status = ?1, started_at = ?2, ended_at = NULL WHERE round_number = ?3"
        }
        RoundStatus::Completed => {
            "UPDATE rounds SET status = ?1, ended_at = ?2, started_at = COALESCE(started_at, ?2) WHERE round_number = ?3"
        }
        RoundStatus::Pending => {
            "UPDATE rounds SET status = ?1, started_at = NULL, ended_at = NULL WHERE round_number = ?3"
        }
    };

    let result = sqlx::query(sql)
        .bind(status)
        .bind(now_rfc3339())
        .bind(round.number())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Round {} not found", round)));
    }

    get_round(pool, round).await
}
