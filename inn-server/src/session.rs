//! In-memory session store
//!
//! Maps opaque bearer tokens to the logged-in principal. Sessions live only
//! as long as the process; a restart logs everyone out.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use inn_common::api::generate_session_token;

/// Default session lifetime
pub const SESSION_TTL_HOURS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Team,
}

/// A logged-in principal
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    pub token: String,
    pub role: Role,
    /// Set for team sessions only
    pub team_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Token → session map shared by all handlers
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create_admin(&self) -> Session {
        self.insert(Role::Admin, None).await
    }

    pub async fn create_team(&self, team_id: &str) -> Session {
        self.insert(Role::Team, Some(team_id.to_string())).await
    }

    async fn insert(&self, role: Role, team_id: Option<String>) -> Session {
        let session = Session {
            token: generate_session_token(),
            role,
            team_id,
            expires_at: Utc::now() + self.ttl,
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > Utc::now());
        sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// Look up a live session; expired entries are dropped on access
    pub async fn get(&self, token: &str) -> Option<Session> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if session.expires_at > Utc::now() => {
                    return Some(session.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        debug!("Session expired");
        self.sessions.write().await.remove(token);
        None
    }

    /// Remove one session; returns whether it existed
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Remove every session of a team (team deleted)
    pub async fn revoke_team(&self, team_id: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.team_id.as_deref() != Some(team_id));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::hours(SESSION_TTL_HOURS))
    }
}
