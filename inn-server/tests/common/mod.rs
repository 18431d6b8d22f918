//! Shared helpers for inn-server integration tests
//!
//! Each test gets its own in-memory database, a temp uploads folder and,
//! when grading is involved, a local stand-in for the generative API.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

use inn_server::grading::{GeminiClient, Grader, KeyRing};
use inn_server::{build_router, AppState};

pub const ADMIN_PASSWORD: &str = "admin-secret";
pub const TEAM_PASSWORD: &str = "team-pass";

/// Router plus the state and temp folder backing it
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_grader(grader: Grader) -> Self {
        Self::build(Some(grader)).await
    }

    async fn build(grader: Option<Grader>) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let pool = inn_common::db::init_memory_database()
            .await
            .expect("in-memory database");

        let mut state = AppState::new(pool, ADMIN_PASSWORD, dir.path().join("uploads"));
        if let Some(grader) = grader {
            state = state.with_grader(grader);
        }

        Self {
            router: build_router(state.clone()),
            state,
            dir,
        }
    }

    /// Send one request through the router
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// JSON request helper returning status and parsed body (Null when empty)
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(json_request(method, uri, token, body)).await;
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/admin/login",
                None,
                Some(json!({ "password": ADMIN_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        body["token"].as_str().expect("token").to_string()
    }

    /// Register a team and log it in; returns (team_id, token)
    pub async fn team(&self, name: &str) -> (String, String) {
        let (status, team) = self
            .call(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "team_name": name,
                    "member1": "Ada",
                    "member2": "Grace",
                    "password": TEAM_PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", team);
        let team_id = team["team_id"].as_str().expect("team_id").to_string();

        let (status, login) = self
            .call(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "team_id": team_id, "password": TEAM_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", login);
        (team_id, login["token"].as_str().expect("token").to_string())
    }

    pub async fn set_round_status(&self, admin: &str, round: i64, status: &str) {
        let (code, body) = self
            .call(
                "PUT",
                &format!("/api/contest/rounds/{}", round),
                Some(admin),
                Some(json!({ "status": status })),
            )
            .await;
        assert_eq!(code, StatusCode::OK, "round update failed: {}", body);
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Stand-in generative API
// =============================================================================

/// Scripted reply of the fake generative API
#[derive(Debug, Clone)]
pub enum FakeReply {
    /// HTTP 200 with this text as the only candidate part
    Text(String),
    /// HTTP error status with a body
    Status(u16, String),
}

impl FakeReply {
    pub fn score(score: f64, analysis: &str) -> Self {
        FakeReply::Text(format!(
            "```json\n{}\n```",
            json!({ "score": score, "analysis": analysis })
        ))
    }

    pub fn rate_limited() -> Self {
        FakeReply::Status(429, r#"{"error":{"message":"Resource has been exhausted"}}"#.into())
    }
}

/// Fake generative API: serves scripted replies and records the keys used
#[derive(Clone, Default)]
pub struct FakeGemini {
    replies: Arc<Mutex<VecDeque<FakeReply>>>,
    /// Per-key override: every call with this key gets this reply
    key_replies: Arc<Mutex<HashMap<String, FakeReply>>>,
    keys_seen: Arc<Mutex<Vec<String>>>,
}

impl FakeGemini {
    pub fn push(&self, reply: FakeReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn always_for_key(&self, key: &str, reply: FakeReply) {
        self.key_replies.lock().unwrap().insert(key.to_string(), reply);
    }

    pub fn keys_seen(&self) -> Vec<String> {
        self.keys_seen.lock().unwrap().clone()
    }

    /// Serve on an ephemeral port; returns the base URL
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/v1beta/models/:model_action", post(fake_generate))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake API");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake API server");
        });
        format!("http://{}", addr)
    }

    /// Grader pointed at this fake with the given keys
    pub async fn grader(&self, keys: &[&str]) -> Grader {
        let base_url = self.spawn().await;
        let client = GeminiClient::new(&base_url, "gemini-test").expect("client");
        Grader::new(client, KeyRing::new(keys.iter().map(|k| k.to_string()).collect()))
    }
}

async fn fake_generate(
    State(fake): State<FakeGemini>,
    Path(model_action): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    assert!(model_action.ends_with(":generateContent"), "{}", model_action);
    assert!(body["contents"][0]["parts"][0]["text"].is_string());

    let key = query.get("key").cloned().unwrap_or_default();
    fake.keys_seen.lock().unwrap().push(key.clone());

    let keyed = fake.key_replies.lock().unwrap().get(&key).cloned();
    let reply = keyed
        .or_else(|| fake.replies.lock().unwrap().pop_front())
        .unwrap_or_else(|| FakeReply::score(5.0, "Default reply"));

    match reply {
        FakeReply::Text(text) => Json(json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
        .into_response(),
        FakeReply::Status(status, body) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response(),
    }
}
