//! Ordered API keys with rate-limit fallback
//!
//! **Algorithm:**
//! 1. Call the operation with the current key
//! 2. Success: return the result; the ring stays on the working key
//! 3. Rate-limited failure (HTTP 429/403, "rate limit", "quota", "forbidden"):
//!    a. advance to the next key (wrapping) exactly once
//!    b. if every key has now been tried, return `KeysExhausted`
//!    c. otherwise retry immediately with the new key
//! 4. Any other failure: return it unchanged (no retry)
//!
//! There is no backoff. The current index is an atomic so concurrent callers
//! that hit the same exhausted key advance the ring only once between them.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

use super::GradingError;

pub struct KeyRing {
    keys: Vec<String>,
    current: AtomicUsize,
}

impl KeyRing {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            current: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the key the next call starts with
    pub fn current_index(&self) -> usize {
        if self.keys.is_empty() {
            0
        } else {
            self.current.load(Ordering::Acquire) % self.keys.len()
        }
    }

    /// Run `operation` with fallback across the configured keys
    ///
    /// # Arguments
    /// * `operation_name` - Name for logging
    /// * `operation` - Async closure receiving the key to use
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, GradingError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, GradingError>>,
    {
        if self.keys.is_empty() {
            return Err(GradingError::NoKeys);
        }

        let mut attempts = 0usize;

        loop {
            let index = self.current_index();
            attempts += 1;

            if attempts > 1 {
                debug!(
                    operation = operation_name,
                    attempt = attempts,
                    key_index = index,
                    "Retrying with next API key"
                );
            }

            match operation(self.keys[index].clone()).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_rate_limited() => {
                    warn!(
                        operation = operation_name,
                        key_index = index,
                        error = %err,
                        "API key rate limited, switching key"
                    );
                    self.advance_from(index);

                    if attempts >= self.keys.len() {
                        warn!(
                            operation = operation_name,
                            attempts, "All API keys exhausted"
                        );
                        return Err(GradingError::KeysExhausted { attempts });
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Move past `index` unless another caller already did
    fn advance_from(&self, index: usize) {
        let next = (index + 1) % self.keys.len();
        let _ = self.current.compare_exchange(
            index,
            next,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys are secrets; only show how many there are
        f.debug_struct("KeyRing")
            .field("keys", &self.keys.len())
            .field("current", &self.current_index())
            .finish()
    }
}
