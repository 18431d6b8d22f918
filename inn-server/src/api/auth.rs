//! Login, registration and bearer-token middleware
//!
//! Tokens come from `Authorization: Bearer <token>`. Missing, unknown and
//! expired tokens are 401; a valid token with the wrong role is 403.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use inn_common::api::auth::constant_time_eq;
use inn_common::api::verify_password;
use inn_common::db::Team;

use crate::db::teams::{self, NewTeam};
use crate::session::{Role, Session};
use crate::{ApiError, ApiResult, AppState};

/// Pull the bearer token out of the headers
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<Session> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    state
        .sessions
        .get(token)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))
}

/// Any logged-in principal
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let session = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Team sessions only
pub async fn require_team(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let session = authenticate(&state, request.headers()).await?;
    if session.role != Role::Team {
        return Err(ApiError::Forbidden("Team login required".to_string()));
    }
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Admin sessions only
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let session = authenticate(&state, request.headers()).await?;
    if !session.is_admin() {
        warn!(team_id = ?session.team_id, "Team session used on admin route");
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Team id of a team session
pub fn session_team_id(session: &Session) -> ApiResult<&str> {
    session
        .team_id
        .as_deref()
        .ok_or_else(|| ApiError::Forbidden("Team login required".to_string()))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub team_name: String,
    pub member1: String,
    pub member2: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub team_id: Option<String>,
    pub team_name: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
}

impl LoginResponse {
    fn new(session: Session, team: Option<Team>) -> Self {
        Self {
            token: session.token,
            role: session.role,
            expires_at: session.expires_at,
            team,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub session: Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let new_team = NewTeam {
        team_id: None,
        team_name: request.team_name,
        member1: request.member1,
        member2: request.member2,
        password: request.password,
    };

    let team = teams::create_team(&state.db, &new_team).await?;
    info!(team_id = %team.team_id, team_name = %team.team_name, "Team registered");
    Ok((StatusCode::CREATED, Json(team)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let team = match (request.team_id.as_deref(), request.team_name.as_deref()) {
        (Some(team_id), _) => teams::get_team(&state.db, team_id.trim()).await?,
        (None, Some(team_name)) => teams::find_by_name(&state.db, team_name).await?,
        (None, None) => {
            return Err(ApiError::BadRequest(
                "team_id or team_name is required".to_string(),
            ))
        }
    };

    let team = team
        .filter(|t| verify_password(&request.password, &t.password_salt, &t.password_hash))
        .ok_or_else(|| ApiError::Unauthorized("Invalid team credentials".to_string()))?;

    let session = state.sessions.create_team(&team.team_id).await;
    info!(team_id = %team.team_id, "Team logged in");
    Ok(Json(LoginResponse::new(session, Some(team))))
}

/// POST /api/auth/admin/login
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if !constant_time_eq(request.password.as_bytes(), state.admin_password.as_bytes()) {
        warn!("Rejected admin login");
        return Err(ApiError::Unauthorized("Invalid admin password".to_string()));
    }

    let session = state.sessions.create_admin().await;
    info!("Admin logged in");
    Ok(Json(LoginResponse::new(session, None)))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token).await;
    }
    StatusCode::NO_CONTENT
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<MeResponse>> {
    let team = match session.team_id.as_deref() {
        Some(team_id) => Some(teams::require_team(&state.db, team_id).await?),
        None => None,
    };
    Ok(Json(MeResponse { session, team }))
}

/// Build auth routes
pub fn auth_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/admin/login", post(admin_login))
        .route("/api/auth/logout", post(logout));

    let authenticated = Router::new()
        .route("/api/auth/me", get(me))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    public.merge(authenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }
}
