//! AI grading job bookkeeping

use sqlx::SqlitePool;
use uuid::Uuid;

use inn_common::db::{AiJob, JobStatus, Round};
use inn_common::time::now_rfc3339;
use inn_common::{Error, Result};

/// Insert a `running` job for `total` evaluations
pub async fn create_job(pool: &SqlitePool, round: Round, total: i64) -> Result<AiJob> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO ai_jobs (id, round_number, status, total, started_at) VALUES (?, ?, 'running', ?, ?)",
    )
    .bind(&id)
    .bind(round.number())
    .bind(total)
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    get_job(pool, &id).await
}

/// Close a job with its final counters
pub async fn finish_job(
    pool: &SqlitePool,
    id: &str,
    status: JobStatus,
    succeeded: i64,
    failed: i64,
    error: Option<&str>,
) -> Result<AiJob> {
    sqlx::query(
        r#"
        UPDATE ai_jobs
        SET status = ?, succeeded = ?, failed = ?, error = ?, finished_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(succeeded)
    .bind(failed)
    .bind(error)
    .bind(now_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    get_job(pool, id).await
}

pub async fn get_job(pool: &SqlitePool, id: &str) -> Result<AiJob> {
    sqlx::query_as::<_, AiJob>("SELECT * FROM ai_jobs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Job '{}' not found", id)))
}

/// Most recent jobs first
pub async fn list_jobs(pool: &SqlitePool, limit: i64) -> Result<Vec<AiJob>> {
    let jobs = sqlx::query_as::<_, AiJob>(
        "SELECT * FROM ai_jobs ORDER BY started_at DESC, id LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(jobs)
}

/// Mark jobs left `running` by a previous process as failed
pub async fn fail_abandoned_jobs(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE ai_jobs SET status = 'failed', error = 'Interrupted by server restart', finished_at = ? WHERE status = 'running'",
    )
    .bind(now_rfc3339())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
