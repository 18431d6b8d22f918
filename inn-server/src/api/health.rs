//! Liveness and build identification, both public

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: i64,
    /// Whether AI grading has at least one key
    pub grading_enabled: bool,
    pub grading_keys: usize,
    /// Index of the key the next grading call starts with
    pub active_key_index: Option<usize>,
}

/// Compile-time identity of this binary, filled in by build.rs
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
}

pub const BUILD: BuildInfo = BuildInfo {
    version: env!("CARGO_PKG_VERSION"),
    git_hash: env!("GIT_HASH"),
    build_timestamp: env!("BUILD_TIMESTAMP"),
    build_profile: env!("BUILD_PROFILE"),
};

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let keys = state.grader.as_deref().map(|grader| grader.keys());
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "inn-server".to_string(),
        version: BUILD.version.to_string(),
        uptime_seconds: (chrono::Utc::now() - state.startup_time).num_seconds(),
        grading_enabled: state.grader.is_some(),
        grading_keys: keys.map_or(0, |ring| ring.len()),
        active_key_index: keys.map(|ring| ring.current_index()),
    })
}

/// GET /api/buildinfo
pub async fn build_info() -> Json<BuildInfo> {
    Json(BUILD)
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/buildinfo", get(build_info))
}
