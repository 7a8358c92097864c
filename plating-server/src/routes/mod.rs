use axum::{
    Router,
    routing::{get, post},
};
use plating_core::api::routes;

use crate::{handlers, infra::app_state::AppState};

/// Create the scoring API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(routes::ROOT, get(handlers::info::root))
        .route(routes::HEALTH, get(handlers::info::health))
        .route(routes::SCORE, post(handlers::score::score))
        .route(routes::SCORE_BATCH, post(handlers::score::score_batch))
        .route(routes::SCORE_FILE, post(handlers::upload::score_file))
}
