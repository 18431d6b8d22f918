//! Contestant endpoints: round status, questions and submissions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use inn_common::db::{Round, RoundState, Submission, Team};
use inn_common::questions::{problems, questions_for, Problem, PublicQuestion};

use super::auth::{require_team, session_team_id};
use super::teams::parse_round;
use crate::db::submissions::{self, AnswerInput};
use crate::db::{rounds, teams};
use crate::session::Session;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct MissionStatus {
    pub team: Team,
    pub rounds: Vec<RoundState>,
    /// Answers already sent for rounds 1 and 2
    pub submissions: Vec<RoundSubmissions>,
}

#[derive(Debug, Serialize)]
pub struct RoundSubmissions {
    pub round: Round,
    pub answers: Vec<Submission>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RoundContent {
    Questions {
        round: Round,
        name: &'static str,
        questions: Vec<PublicQuestion>,
    },
    Problems {
        round: Round,
        name: &'static str,
        problems: Vec<Problem>,
    },
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswersResponse {
    pub round: Round,
    pub submitted: usize,
    pub submitted_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    pub score: f64,
}

/// 403 unless `round` is currently active
async fn ensure_round_open(state: &AppState, round: Round) -> ApiResult<()> {
    let current = rounds::get_round(&state.db, round).await?;
    if !current.is_active() {
        return Err(ApiError::Forbidden(format!(
            "Round {} is {}",
            round, current.status
        )));
    }
    Ok(())
}

/// GET /api/mission/status
pub async fn mission_status(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<MissionStatus>> {
    let team_id = session_team_id(&session)?;
    let team = teams::require_team(&state.db, team_id).await?;
    let rounds = rounds::list_rounds(&state.db).await?;

    let mut sent = Vec::new();
    for round in Round::ALL {
        if round.is_ai_graded() && team.submitted(round) {
            let answers = submissions::list_submissions(&state.db, &team.team_id, round).await?;
            sent.push(RoundSubmissions { round, answers });
        }
    }

    Ok(Json(MissionStatus {
        team,
        rounds,
        submissions: sent,
    }))
}

/// GET /api/mission/questions/:round
pub async fn round_questions(
    State(state): State<AppState>,
    Path(round): Path<i64>,
) -> ApiResult<Json<RoundContent>> {
    let round = parse_round(round)?;
    ensure_round_open(&state, round).await?;

    let content = match round {
        Round::Programming => RoundContent::Problems {
            round,
            name: round.name(),
            problems: problems().to_vec(),
        },
        _ => RoundContent::Questions {
            round,
            name: round.name(),
            questions: questions_for(round).iter().map(PublicQuestion::from).collect(),
        },
    };
    Ok(Json(content))
}

async fn submit_answers(
    state: &AppState,
    session: &Session,
    round: Round,
    request: SubmitAnswersRequest,
) -> ApiResult<(StatusCode, Json<SubmitAnswersResponse>)> {
    let team_id = session_team_id(session)?;
    ensure_round_open(state, round).await?;

    let stored = submissions::submit_answers(&state.db, team_id, round, &request.answers).await?;
    info!(
        team_id = %team_id,
        round = round.number(),
        answers = stored.len(),
        "Answers submitted"
    );

    let submitted_at = stored
        .first()
        .map(|s| s.submitted_at.clone())
        .unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        Json(SubmitAnswersResponse {
            round,
            submitted: stored.len(),
            submitted_at,
        }),
    ))
}

/// POST /api/mission/round1/submit
pub async fn submit_round1(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<SubmitAnswersRequest>,
) -> ApiResult<(StatusCode, Json<SubmitAnswersResponse>)> {
    submit_answers(&state, &session, Round::Reasoning, request).await
}

/// POST /api/mission/round2/submit
pub async fn submit_round2(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<SubmitAnswersRequest>,
) -> ApiResult<(StatusCode, Json<SubmitAnswersResponse>)> {
    submit_answers(&state, &session, Round::Debugging, request).await
}

/// POST /api/mission/round3/submit
pub async fn submit_round3(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<SubmitScoreRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let team_id = session_team_id(&session)?;
    ensure_round_open(&state, Round::Programming).await?;

    let team = submissions::submit_round3_score(&state.db, team_id, request.score).await?;
    info!(team_id = %team_id, score = request.score, "Round 3 score submitted");
    Ok((StatusCode::CREATED, Json(team)))
}

/// Build contestant routes
pub fn mission_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/mission/status", get(mission_status))
        .route("/api/mission/questions/:round", get(round_questions))
        .route("/api/mission/round1/submit", post(submit_round1))
        .route("/api/mission/round2/submit", post(submit_round2))
        .route("/api/mission/round3/submit", post(submit_round3))
        .route_layer(middleware::from_fn_with_state(state, require_team))
}
