//! Sequential grading of a round's pending evaluations
//!
//! One `ai_jobs` row is written per run. Answers are graded one at a time
//! through the key ring; a fatal key error (no keys, all keys exhausted)
//! stops the run and leaves the remaining evaluations pending for the next
//! run. Transport errors on a single answer also leave it pending. A
//! database error ends the run too, with the job recorded as failed.

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use inn_common::db::{AiJob, Evaluation, JobStatus, Round};
use inn_common::questions::find_question;
use inn_common::Result;

use super::{Grader, PARSE_FAILURE_MESSAGE};
use crate::db::{evaluations, jobs};

/// Grade every pending evaluation of `round` and return the finished job
pub async fn run_round(pool: &SqlitePool, grader: &Grader, round: Round) -> Result<AiJob> {
    let pending = evaluations::pending_for_round(pool, round).await?;
    let job = jobs::create_job(pool, round, pending.len() as i64).await?;

    info!(
        job_id = %job.id,
        round = round.number(),
        total = pending.len(),
        model = grader.model(),
        "Starting AI evaluation job"
    );

    let mut tally = Tally::default();
    let abort_reason = match grade_pending(pool, grader, round, &job.id, &pending, &mut tally).await
    {
        Ok(reason) => reason,
        Err(e) => {
            error!(job_id = %job.id, error = %e, "AI evaluation job failed");
            jobs::finish_job(
                pool,
                &job.id,
                JobStatus::Failed,
                tally.succeeded,
                tally.failed,
                Some(&e.to_string()),
            )
            .await?;
            return Err(e);
        }
    };

    let status = if abort_reason.is_some() {
        JobStatus::Failed
    } else {
        JobStatus::Completed
    };
    let job = jobs::finish_job(
        pool,
        &job.id,
        status,
        tally.succeeded,
        tally.failed,
        abort_reason.as_deref(),
    )
    .await?;

    info!(
        job_id = %job.id,
        status = %job.status,
        succeeded = tally.succeeded,
        failed = tally.failed,
        "AI evaluation job finished"
    );
    Ok(job)
}

#[derive(Debug, Default)]
struct Tally {
    succeeded: i64,
    failed: i64,
}

/// Grade each evaluation in turn; `Ok(Some(reason))` when a key error stopped the run
async fn grade_pending(
    pool: &SqlitePool,
    grader: &Grader,
    round: Round,
    job_id: &str,
    pending: &[Evaluation],
    tally: &mut Tally,
) -> Result<Option<String>> {
    for evaluation in pending {
        let Some(question) = find_question(round, &evaluation.question_id) else {
            warn!(
                evaluation_id = %evaluation.id,
                question_id = %evaluation.question_id,
                "Question no longer in the bank; scoring 0"
            );
            evaluations::record_ai_result(pool, &evaluation.id, 0.0, PARSE_FAILURE_MESSAGE, false)
                .await?;
            tally.failed += 1;
            continue;
        };

        match grader.grade(question, &evaluation.answer).await {
            Ok(parsed) => {
                evaluations::record_ai_result(
                    pool,
                    &evaluation.id,
                    parsed.score,
                    &parsed.analysis,
                    parsed.parsed,
                )
                .await?;
                if parsed.parsed {
                    tally.succeeded += 1;
                } else {
                    tally.failed += 1;
                }
            }
            Err(e) if e.is_fatal() => {
                error!(job_id, error = %e, "Aborting AI evaluation job");
                return Ok(Some(e.to_string()));
            }
            Err(e) => {
                warn!(
                    evaluation_id = %evaluation.id,
                    error = %e,
                    "Evaluation left pending after API error"
                );
                tally.failed += 1;
            }
        }
    }

    Ok(None)
}
