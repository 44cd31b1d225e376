//! HTTP API for the observation-entry workflow.
//!
//! `GET /api/health` and `POST /api/analyze`. The router is composable:
//! `api_router()` returns a `Router` that can be mounted on any axum server.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
