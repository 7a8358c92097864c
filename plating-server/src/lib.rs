//! # Plating Server
//!
//! HTTP front end for the Plating image aesthetics pipeline.
//!
//! Every scoring route shares one [`AppState`]: the resolved configuration,
//! the model handle loaded at startup and the scratch directory manager.
//! Request handling lives in `plating-core`; this crate maps it onto axum.

pub mod handlers;
pub mod infra;
pub mod routes;

use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub use infra::app_state::AppState;

/// Build the CORS layer: permissive unless an origin allow-list is configured.
pub fn cors_layer(state: &AppState) -> CorsLayer {
    let cors = &state.config().cors;
    if cors.is_permissive() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Assemble the full application: routes, body limit, tracing and CORS.
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config().server.max_body_bytes;

    routes::create_router()
        .layer(DefaultBodyLimit::max(body_limit))
        // Last layer is outermost: CORS, then tracing.
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state))
        .with_state(state)
}
