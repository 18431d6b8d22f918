//! HTTP API handlers for inn-server

pub mod auth;
pub mod contest;
pub mod evaluations;
pub mod health;
pub mod mission;
pub mod sse;
pub mod teams;
pub mod uploads;

pub use auth::auth_routes;
pub use contest::contest_routes;
pub use evaluations::evaluation_routes;
pub use health::health_routes;
pub use mission::mission_routes;
pub use teams::team_routes;
pub use uploads::upload_routes;
