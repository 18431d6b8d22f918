//! Database access layer for inn-server
//!
//! One module per table group. Functions take the pool (or an open
//! transaction) and return `inn_common::Result`.

pub mod evaluations;
pub mod jobs;
pub mod rankings;
pub mod rounds;
pub mod submissions;
pub mod teams;
pub mod telecast;
pub mod uploads;
