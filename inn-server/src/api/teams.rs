//! Admin team management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use std::io::ErrorKind;
use tracing::{info, warn};

use inn_common::db::{Round, Team};

use super::auth::require_admin;
use crate::db::teams::{self, NewTeam};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub round: i64,
    pub score: f64,
}

/// Parse a round number from a request, 400 when outside 1..=3
pub fn parse_round(value: i64) -> ApiResult<Round> {
    Round::try_from(value).map_err(ApiError::BadRequest)
}

/// GET /api/teams
pub async fn list_teams(State(state): State<AppState>) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(teams::list_teams(&state.db).await?))
}

/// POST /api/teams
pub async fn create_team(
    State(state): State<AppState>,
    Json(new_team): Json<NewTeam>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let team = teams::create_team(&state.db, &new_team).await?;
    info!(team_id = %team.team_id, "Team created by admin");
    Ok((StatusCode::CREATED, Json(team)))
}

/// GET /api/teams/:team_id
pub async fn get_team(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<Json<Team>> {
    Ok(Json(teams::require_team(&state.db, &team_id).await?))
}

/// PUT /api/teams/:team_id/score
pub async fn set_score(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Json(request): Json<ScoreRequest>,
) -> ApiResult<Json<Team>> {
    let round = parse_round(request.round)?;
    let team = teams::set_round_score(&state.db, &team_id, round, request.score).await?;
    info!(team_id = %team_id, round = round.number(), score = request.score, "Round score set");
    Ok(Json(team))
}

/// DELETE /api/teams/:team_id
///
/// Also drops the team's sessions and uploaded files.
pub async fn delete_team(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<StatusCode> {
    teams::delete_team(&state.db, &team_id).await?;
    let revoked = state.sessions.revoke_team(&team_id).await;

    let team_dir = state.uploads_dir.join(&team_id);
    match tokio::fs::remove_dir_all(&team_dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove {}: {}", team_dir.display(), e),
    }

    info!(team_id = %team_id, revoked_sessions = revoked, "Team deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Build admin team routes
pub fn team_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/teams", get(list_teams).post(create_team))
        .route("/api/teams/:team_id", get(get_team).delete(delete_team))
        .route("/api/teams/:team_id/score", put(set_score))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}
