//! inn-server library - contest backend for I'M GOING INN
//!
//! Exposes the router and state so integration tests can drive the real
//! HTTP surface with `tower::ServiceExt::oneshot`.

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use inn_common::db::Round;
use inn_common::events::EventBus;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod grading;
pub mod session;

pub use crate::error::{ApiError, ApiResult};

use crate::grading::Grader;
use crate::session::SessionStore;

/// Buffered events per SSE subscriber before it starts lagging
const EVENT_BUS_CAPACITY: usize = 100;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Bearer token sessions
    pub sessions: SessionStore,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// `None` when no generative API key is configured
    pub grader: Option<Arc<Grader>>,
    pub admin_password: Arc<str>,
    /// Where uploaded files are written (`<root>/uploads`)
    pub uploads_dir: PathBuf,
    /// Rounds with an AI job in progress
    pub running_jobs: Arc<Mutex<HashSet<Round>>>,
    /// Allowed CORS origin; any origin when `None`
    pub frontend_url: Option<String>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, admin_password: &str, uploads_dir: PathBuf) -> Self {
        Self {
            db,
            sessions: SessionStore::default(),
            event_bus: EventBus::new(EVENT_BUS_CAPACITY),
            grader: None,
            admin_password: Arc::from(admin_password),
            uploads_dir,
            running_jobs: Arc::new(Mutex::new(HashSet::new())),
            frontend_url: None,
            startup_time: Utc::now(),
        }
    }

    pub fn with_grader(mut self, grader: Grader) -> Self {
        self.grader = Some(Arc::new(grader));
        self
    }

    pub fn with_frontend_url(mut self, frontend_url: Option<String>) -> Self {
        self.frontend_url = frontend_url;
        self
    }
}

/// Build application router
///
/// Public, team and admin routes are separate routers so each group gets
/// its own auth layer.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.frontend_url.as_deref());

    Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes(state.clone()))
        .merge(api::contest_routes(state.clone()))
        .merge(api::evaluation_routes(state.clone()))
        .merge(api::team_routes(state.clone()))
        .merge(api::mission_routes(state.clone()))
        .merge(api::upload_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let Some(origin) = frontend_url else {
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-file-name"),
            ]),
        Err(e) => {
            warn!("Invalid FRONTEND_URL {:?} ({}), allowing any origin", origin, e);
            CorsLayer::permissive()
        }
    }
}
