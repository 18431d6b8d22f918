//! Evaluation records for AI-graded rounds

use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqlitePool};

use inn_common::db::{Evaluation, EvaluationStatus, Round};
use inn_common::questions::{find_question, MAX_ROUND_SCORE};
use inn_common::time::now_rfc3339;
use inn_common::{Error, Result};

/// Filter for listing evaluations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationFilter {
    pub round: Option<Round>,
    pub status: Option<EvaluationStatus>,
    pub team_id: Option<String>,
}

pub async fn list_evaluations(
    pool: &SqlitePool,
    filter: &EvaluationFilter,
) -> Result<Vec<Evaluation>> {
    let rows = sqlx::query_as::<_, Evaluation>(
        r#"
        SELECT * FROM evaluation
        WHERE (?1 IS NULL OR round_number = ?1)
          AND (?2 IS NULL OR status = ?2)
          AND (?3 IS NULL OR team_id = ?3)
        ORDER BY round_number, team_id, question_id
        "#,
    )
    .bind(filter.round.map(Round::number))
    .bind(filter.status.map(EvaluationStatus::as_str))
    .bind(filter.team_id.as_deref())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_evaluation(pool: &SqlitePool, id: &str) -> Result<Evaluation> {
    sqlx::query_as::<_, Evaluation>("SELECT * FROM evaluation WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Evaluation '{}' not found", id)))
}

/// Pending evaluations of a round, oldest first
pub async fn pending_for_round(pool: &SqlitePool, round: Round) -> Result<Vec<Evaluation>> {
    let rows = sqlx::query_as::<_, Evaluation>(
        "SELECT * FROM evaluation WHERE round_number = ? AND status = 'pending' ORDER BY created_at, id",
    )
    .bind(round.number())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Evaluations of `round` still waiting for a grade
pub async fn count_pending<'e, E>(executor: E, round: Round) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM evaluation WHERE round_number = ? AND status = 'pending'",
    )
    .bind(round.number())
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// Store the model's verdict
///
/// `parsed == false` stores the evaluation as `failed` with its zero score
/// so the round can still be finalized; an admin may override it later.
/// Evaluations already overridden are left alone.
pub async fn record_ai_result(
    pool: &SqlitePool,
    id: &str,
    score: f64,
    analysis: &str,
    parsed: bool,
) -> Result<()> {
    let status = if parsed {
        EvaluationStatus::Completed
    } else {
        EvaluationStatus::Failed
    };

    sqlx::query(
        r#"
        UPDATE evaluation
        SET status = ?, ai_score = ?, ai_analysis = ?, final_score = ?, updated_at = ?
        WHERE id = ? AND status != 'overridden'
        "#,
    )
    .bind(status.as_str())
    .bind(score)
    .bind(analysis)
    .bind(score)
    .bind(now_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Admin override; the score must fit the question's points
pub async fn override_evaluation(
    pool: &SqlitePool,
    id: &str,
    score: f64,
    notes: Option<&str>,
) -> Result<Evaluation> {
    let evaluation = get_evaluation(pool, id).await?;
    let max_points = Round::try_from(evaluation.round_number)
        .ok()
        .and_then(|round| find_question(round, &evaluation.question_id))
        .map(|q| q.max_points)
        .unwrap_or(MAX_ROUND_SCORE);

    if !score.is_finite() || !(0.0..=max_points).contains(&score) {
        return Err(Error::InvalidInput(format!(
            "score must be between 0 and {}",
            max_points
        )));
    }

    sqlx::query(
        r#"
        UPDATE evaluation
        SET status = 'overridden', admin_score = ?, admin_notes = ?, final_score = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(score)
    .bind(notes.map(str::trim).filter(|n| !n.is_empty()))
    .bind(score)
    .bind(now_rfc3339())
    .bind(id)
    .execute(pool)
    .await?;

    get_evaluation(pool, id).await
}

/// Per-team totals written by `finalize_round`
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FinalizedScore {
    pub team_id: String,
    pub score: f64,
}

/// Write each team's round score as the sum of its final scores
///
/// Refused with `Conflict` while any evaluation of the round is pending.
/// Sums are clamped to [0, 99].
pub async fn finalize_round(pool: &SqlitePool, round: Round) -> Result<Vec<FinalizedScore>> {
    if !round.is_ai_graded() {
        return Err(Error::InvalidInput(format!(
            "Round {} is not graded per question",
            round
        )));
    }

    let mut tx = pool.begin().await?;

    let pending = count_pending(&mut *tx, round).await?;
    if pending > 0 {
        return Err(Error::Conflict(format!(
            "Round {} still has {} pending evaluations",
            round, pending
        )));
    }

    let totals: Vec<(String, f64)> = sqlx::query_as(
        r#"
        SELECT team_id, COALESCE(SUM(final_score), 0.0)
        FROM evaluation
        WHERE round_number = ?
        GROUP BY team_id
        ORDER BY team_id
        "#,
    )
    .bind(round.number())
    .fetch_all(&mut *tx)
    .await?;

    let now = now_rfc3339();
    let sql = format!(
        "UPDATE teams SET {}_score = ?, updated_at = ? WHERE team_id = ?",
        round.column_prefix()
    );

    let mut finalized = Vec::with_capacity(totals.len());
    for (team_id, total) in totals {
        let score = (total.clamp(0.0, MAX_ROUND_SCORE) * 10.0).round() / 10.0;
        sqlx::query(&sql)
            .bind(score)
            .bind(&now)
            .bind(&team_id)
            .execute(&mut *tx)
            .await?;
        finalized.push(FinalizedScore { team_id, score });
    }

    tx.commit().await?;
    Ok(finalized)
}
