//! Shared credential handling
//!
//! Pure functions only (no HTTP framework dependencies). The server wraps
//! these with its own Axum extractors and session store.

pub mod auth;

pub use auth::{
    generate_salt, generate_session_token, hash_password, verify_password, PasswordHash,
};
