//! Round state, leaderboard and telecast
//!
//! Reads are public so the scoreboard can be shown without a login; every
//! change is admin-only and announced on the event bus.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use inn_common::db::{RoundState, RoundStatus, Telecast, TelecastViewer};
use inn_common::events::ContestEvent;
use inn_common::time::now;

use super::auth::{require_admin, require_team, session_team_id};
use super::teams::parse_round;
use crate::db::rankings::{self, RankingEntry, RankingScope};
use crate::db::{rounds, telecast};
use crate::session::Session;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct RoundStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RankingsQuery {
    pub round: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RankingsResponse {
    /// `1`, `2`, `3` or `"overall"`
    pub round: serde_json::Value,
    pub rankings: Vec<RankingEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TelecastRequest {
    pub active: bool,
    pub video_url: Option<String>,
    pub message: Option<String>,
}

/// GET /api/contest/rounds
pub async fn list_rounds(State(state): State<AppState>) -> ApiResult<Json<Vec<RoundState>>> {
    Ok(Json(rounds::list_rounds(&state.db).await?))
}

/// PUT /api/contest/rounds/:round
pub async fn set_round_status(
    State(state): State<AppState>,
    Path(round): Path<i64>,
    Json(request): Json<RoundStatusRequest>,
) -> ApiResult<Json<RoundState>> {
    let round = parse_round(round)?;
    let status: RoundStatus = request.status.trim().parse().map_err(ApiError::BadRequest)?;

    let updated = rounds::set_round_status(&state.db, round, status).await?;
    info!(round = round.number(), status = status.as_str(), "Round status changed");

    state.event_bus.emit_lossy(ContestEvent::RoundStatusChanged {
        round,
        status,
        timestamp: now(),
    });
    Ok(Json(updated))
}

/// GET /api/contest/rankings?round=1|2|3|overall
pub async fn get_rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingsQuery>,
) -> ApiResult<Json<RankingsResponse>> {
    let scope: RankingScope = query
        .round
        .as_deref()
        .unwrap_or("overall")
        .parse()
        .map_err(ApiError::BadRequest)?;

    let rankings = rankings::list_rankings(&state.db, scope).await?;
    let round = match scope {
        RankingScope::Round(round) => json!(round.number()),
        RankingScope::Overall => json!("overall"),
    };
    Ok(Json(RankingsResponse { round, rankings }))
}

/// POST /api/contest/rankings/compute
pub async fn compute_rankings(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let teams = rankings::compute_rankings(&state.db).await?;
    info!(teams, "Rankings recomputed");

    state
        .event_bus
        .emit_lossy(ContestEvent::RankingsUpdated { timestamp: now() });
    Ok(Json(json!({ "teams_ranked": teams })))
}

/// GET /api/contest/telecast
pub async fn get_telecast(State(state): State<AppState>) -> ApiResult<Json<Telecast>> {
    Ok(Json(telecast::get_telecast(&state.db).await?))
}

/// PUT /api/contest/telecast
pub async fn set_telecast(
    State(state): State<AppState>,
    Json(request): Json<TelecastRequest>,
) -> ApiResult<Json<Telecast>> {
    let updated = telecast::set_telecast(
        &state.db,
        request.active,
        request.video_url.as_deref(),
        request.message.as_deref(),
    )
    .await?;
    info!(active = updated.active, "Telecast updated");

    state.event_bus.emit_lossy(ContestEvent::TelecastChanged {
        active: updated.active,
        video_url: updated.video_url.clone(),
        message: updated.message.clone(),
        timestamp: now(),
    });
    Ok(Json(updated))
}

/// POST /api/contest/telecast/ack
pub async fn acknowledge_telecast(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<StatusCode> {
    let team_id = session_team_id(&session)?;
    telecast::acknowledge(&state.db, team_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/contest/telecast/viewers
pub async fn telecast_viewers(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TelecastViewer>>> {
    Ok(Json(telecast::list_viewers(&state.db).await?))
}

/// Build contest routes
pub fn contest_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/contest/rounds", get(list_rounds))
        .route("/api/contest/rankings", get(get_rankings))
        .route("/api/contest/telecast", get(get_telecast))
        .route("/api/contest/events", get(super::sse::event_stream));

    let team = Router::new()
        .route("/api/contest/telecast/ack", post(acknowledge_telecast))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_team));

    let admin = Router::new()
        .route("/api/contest/rounds/:round", put(set_round_status))
        .route("/api/contest/rankings/compute", post(compute_rankings))
        .route("/api/contest/telecast", put(set_telecast))
        .route("/api/contest/telecast/viewers", get(telecast_viewers))
        .route_layer(middleware::from_fn_with_state(state, require_admin));

    public.merge(team).merge(admin)
}
