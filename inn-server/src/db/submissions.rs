//! Answer submission for rounds 1 and 2, self-reported score for round 3
//!
//! Each round can be submitted once per team. The `roundN_submitted` flag is
//! claimed with a conditional UPDATE inside the same transaction that stores
//! the answers, so two concurrent submissions cannot both succeed.

use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use inn_common::db::{Round, Submission, Team};
use inn_common::questions::find_question;
use inn_common::time::now_rfc3339;
use inn_common::{Error, Result};

use super::teams::{require_team, validate_round_score};

/// One answer in a round 1/2 submission
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerInput {
    pub question_id: String,
    pub answer: String,
}

fn submissions_table(round: Round) -> Result<&'static str> {
    match round {
        Round::Reasoning => Ok("submissions_round1"),
        Round::Debugging => Ok("submissions_round2"),
        Round::Programming => Err(Error::InvalidInput(
            "Round 3 takes a score, not answers".into(),
        )),
    }
}

/// Check answers against the question bank
fn validate_answers(round: Round, answers: &[AnswerInput]) -> Result<()> {
    if answers.is_empty() {
        return Err(Error::InvalidInput("At least one answer is required".into()));
    }

    let mut seen = std::collections::HashSet::new();
    for answer in answers {
        if find_question(round, &answer.question_id).is_none() {
            return Err(Error::InvalidInput(format!(
                "Unknown question '{}' for round {}",
                answer.question_id, round
            )));
        }
        if !seen.insert(answer.question_id.as_str()) {
            return Err(Error::InvalidInput(format!(
                "Question '{}' answered more than once",
                answer.question_id
            )));
        }
        if answer.answer.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "Answer for '{}' is empty",
                answer.question_id
            )));
        }
    }
    Ok(())
}

/// Set `roundN_submitted` if not already set
///
/// Returns `Conflict` when the team already submitted and `NotFound` when
/// the team does not exist.
async fn claim_submission(
    tx: &mut Transaction<'_, Sqlite>,
    team_id: &str,
    round: Round,
    now: &str,
) -> Result<()> {
    let sql = format!(
        "UPDATE teams SET {p}_submitted = 1, updated_at = ? WHERE team_id = ? AND {p}_submitted = 0",
        p = round.column_prefix()
    );
    let result = sqlx::query(&sql)
        .bind(now)
        .bind(team_id)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    let exists: Option<String> = sqlx::query_scalar("SELECT team_id FROM teams WHERE team_id = ?")
        .bind(team_id)
        .fetch_optional(&mut **tx)
        .await?;

    match exists {
        Some(_) => Err(Error::Conflict(format!(
            "Round {} already submitted",
            round
        ))),
        None => Err(Error::NotFound(format!("Team '{}' not found", team_id))),
    }
}

/// Store a round 1/2 submission and queue one pending evaluation per answer
pub async fn submit_answers(
    pool: &SqlitePool,
    team_id: &str,
    round: Round,
    answers: &[AnswerInput],
) -> Result<Vec<Submission>> {
    let table = submissions_table(round)?;
    validate_answers(round, answers)?;

    let now = now_rfc3339();
    let mut tx = pool.begin().await?;

    claim_submission(&mut tx, team_id, round, &now).await?;

    let insert_sql = format!(
        "INSERT INTO {} (id, team_id, question_id, answer, submitted_at) VALUES (?, ?, ?, ?, ?)",
        table
    );

    let mut stored = Vec::with_capacity(answers.len());
    for answer in answers {
        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.to_string(),
            question_id: answer.question_id.clone(),
            answer: answer.answer.trim().to_string(),
            submitted_at: now.clone(),
        };

        sqlx::query(&insert_sql)
            .bind(&submission.id)
            .bind(&submission.team_id)
            .bind(&submission.question_id)
            .bind(&submission.answer)
            .bind(&submission.submitted_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::from_insert(e, "Submission"))?;

        sqlx::query(
            r#"
            INSERT INTO evaluation (
                id, team_id, round_number, question_id, answer, status,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(team_id)
        .bind(round.number())
        .bind(&submission.question_id)
        .bind(&submission.answer)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::from_insert(e, "Evaluation"))?;

        stored.push(submission);
    }

    tx.commit().await?;
    Ok(stored)
}

/// Record the self-reported round 3 score
pub async fn submit_round3_score(pool: &SqlitePool, team_id: &str, score: f64) -> Result<Team> {
    let score = validate_round_score(score)?;
    let now = now_rfc3339();

    let mut tx = pool.begin().await?;
    claim_submission(&mut tx, team_id, Round::Programming, &now).await?;

    sqlx::query("UPDATE teams SET round3_score = ? WHERE team_id = ?")
        .bind(score)
        .bind(team_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    require_team(pool, team_id).await
}

/// Stored answers of one team for round 1 or 2
pub async fn list_submissions(
    pool: &SqlitePool,
    team_id: &str,
    round: Round,
) -> Result<Vec<Submission>> {
    let table = submissions_table(round)?;
    let sql = format!(
        "SELECT * FROM {} WHERE team_id = ? ORDER BY question_id",
        table
    );
    let rows = sqlx::query_as::<_, Submission>(&sql)
        .bind(team_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
