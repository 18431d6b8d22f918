//! AI evaluation administration
//!
//! Runs are synchronous: the request returns once every pending answer of
//! the round has been graded (or the key ring gave up). Only one run per
//! round may be in flight.

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::info;

use inn_common::db::{AiJob, Evaluation, EvaluationStatus, Round};
use inn_common::events::ContestEvent;
use inn_common::time::now;

use super::auth::require_admin;
use super::teams::parse_round;
use crate::db::evaluations::{self, EvaluationFilter, FinalizedScore};
use crate::db::jobs;
use crate::grading::run_round;
use crate::{ApiError, ApiResult, AppState};

/// Jobs listed by `GET /api/contest/jobs`
const RECENT_JOBS_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct EvaluationQuery {
    pub round: Option<i64>,
    pub status: Option<String>,
    pub team_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoundRequest {
    pub round: i64,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub score: f64,
    pub notes: Option<String>,
}

/// Marks a round as having a job in flight; cleared on drop
struct RunningJobGuard {
    running: Arc<Mutex<HashSet<Round>>>,
    round: Round,
}

impl RunningJobGuard {
    fn acquire(running: &Arc<Mutex<HashSet<Round>>>, round: Round) -> ApiResult<Self> {
        let mut set = running.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(round) {
            return Err(ApiError::Conflict(format!(
                "An evaluation job for round {} is already running",
                round
            )));
        }
        Ok(Self {
            running: Arc::clone(running),
            round,
        })
    }
}

impl Drop for RunningJobGuard {
    fn drop(&mut self) {
        let mut set = self.running.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.round);
    }
}

fn ai_graded_round(value: i64) -> ApiResult<Round> {
    let round = parse_round(value)?;
    if !round.is_ai_graded() {
        return Err(ApiError::BadRequest(format!(
            "Round {} is not graded per question",
            round
        )));
    }
    Ok(round)
}

/// GET /api/contest/evaluations?round=&status=&team_id=
pub async fn list_evaluations(
    State(state): State<AppState>,
    Query(query): Query<EvaluationQuery>,
) -> ApiResult<Json<Vec<Evaluation>>> {
    let filter = EvaluationFilter {
        round: query.round.map(parse_round).transpose()?,
        status: query
            .status
            .as_deref()
            .map(|s| s.parse::<EvaluationStatus>())
            .transpose()
            .map_err(ApiError::BadRequest)?,
        team_id: query.team_id,
    };
    Ok(Json(evaluations::list_evaluations(&state.db, &filter).await?))
}

/// POST /api/contest/evaluations/run
pub async fn run_evaluations(
    State(state): State<AppState>,
    Json(request): Json<RoundRequest>,
) -> ApiResult<Json<AiJob>> {
    let round = ai_graded_round(request.round)?;
    let grader = state
        .grader
        .clone()
        .ok_or_else(|| ApiError::Upstream("AI grading is not configured (no API keys)".to_string()))?;

    let _guard = RunningJobGuard::acquire(&state.running_jobs, round)?;
    let job = run_round(&state.db, &grader, round).await?;

    state.event_bus.emit_lossy(ContestEvent::EvaluationJobFinished {
        job_id: job.id.clone(),
        round,
        succeeded: job.succeeded,
        failed: job.failed,
        timestamp: now(),
    });
    Ok(Json(job))
}

/// PUT /api/contest/evaluations/:id
pub async fn override_evaluation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OverrideRequest>,
) -> ApiResult<Json<Evaluation>> {
    let evaluation =
        evaluations::override_evaluation(&state.db, &id, request.score, request.notes.as_deref())
            .await?;
    info!(evaluation_id = %id, score = request.score, "Evaluation overridden");
    Ok(Json(evaluation))
}

/// POST /api/contest/evaluations/finalize
pub async fn finalize_round(
    State(state): State<AppState>,
    Json(request): Json<RoundRequest>,
) -> ApiResult<Json<Vec<FinalizedScore>>> {
    let round = ai_graded_round(request.round)?;
    let finalized = evaluations::finalize_round(&state.db, round).await?;
    info!(round = round.number(), teams = finalized.len(), "Round finalized");
    Ok(Json(finalized))
}

/// GET /api/contest/jobs
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<AiJob>>> {
    Ok(Json(jobs::list_jobs(&state.db, RECENT_JOBS_LIMIT).await?))
}

/// Build evaluation admin routes
pub fn evaluation_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/contest/evaluations", get(list_evaluations))
        .route("/api/contest/evaluations/run", post(run_evaluations))
        .route("/api/contest/evaluations/finalize", post(finalize_round))
        .route("/api/contest/evaluations/:id", put(override_evaluation))
        .route("/api/contest/jobs", get(list_jobs))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}
