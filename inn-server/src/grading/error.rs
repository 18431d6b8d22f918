//! Errors raised while calling the generative API

use thiserror::Error;

/// Generative API call failures
#[derive(Debug, Clone, Error)]
pub enum GradingError {
    /// No API keys configured
    #[error("No generative API keys configured")]
    NoKeys,

    /// Every configured key was rejected as rate limited / over quota
    #[error("All API keys exhausted after {attempts} rate-limited attempts")]
    KeysExhausted { attempts: usize },

    /// Non-success HTTP status from the API
    #[error("Generative API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network, timeout or TLS failure
    #[error("Generative API request failed: {0}")]
    Transport(String),

    /// Response did not have the expected shape
    #[error("Unexpected generative API response: {0}")]
    Parse(String),
}

impl GradingError {
    /// Whether the failure should move the key ring to the next key
    ///
    /// True for HTTP 429/403, and for any error whose message mentions a
    /// rate limit, a quota or "forbidden".
    pub fn is_rate_limited(&self) -> bool {
        match self {
            GradingError::Http { status: 429 | 403, .. } => true,
            GradingError::NoKeys | GradingError::KeysExhausted { .. } => false,
            other => {
                let message = other.to_string().to_lowercase();
                ["rate limit", "quota", "forbidden"]
                    .iter()
                    .any(|needle| message.contains(needle))
            }
        }
    }

    /// Whether grading of further answers is pointless
    pub fn is_fatal(&self) -> bool {
        matches!(self, GradingError::NoKeys | GradingError::KeysExhausted { .. })
    }
}
