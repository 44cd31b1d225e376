//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::endpoints::analyze::MAX_IMAGE_BYTES;
use crate::api::types::ApiContext;

/// Request body ceiling: a maximal image after base64 expansion, plus
/// JSON framing.
const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES / 3 * 4 + 64 * 1024;

/// Build the API router.
///
/// CORS is permissive: the calling workflow is a browser app served from
/// another origin. Suggestions are per-frame and never cacheable.
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/analyze", post(endpoints::analyze::analyze))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
}
