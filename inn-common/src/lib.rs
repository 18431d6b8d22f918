//! # INN Common Library
//!
//! Shared code for the I'M GOING INN contest backend including:
//! - Database initialization and row models
//! - Contest event types (ContestEvent enum) and the EventBus
//! - Password hashing and session token helpers
//! - Configuration loading
//! - The static question bank for rounds 1-3

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod questions;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
