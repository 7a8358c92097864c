use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use plating_core::{
    BatchResponse,
    api::{ScoreRequest, ScoreResponse},
};
use serde_json::Value;
use tracing::info;

use crate::infra::{app_state::AppState, errors::AppResult};

/// Score one base64-encoded image.
pub async fn score(
    State(state): State<AppState>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> AppResult<Json<ScoreResponse>> {
    let pipeline = state.pipeline()?;
    let Json(request) = payload?;

    let scored = pipeline
        .run_base64(&request.image_data, request.image_format)
        .await?;
    info!(score = scored.score, size = %scored.size_label(), "image scored");

    Ok(Json(ScoreResponse::from(scored)))
}

/// Score a JSON array of images. Item failures never fail the request.
pub async fn score_batch(
    State(state): State<AppState>,
    payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> AppResult<Json<BatchResponse>> {
    let orchestrator = state.orchestrator()?;
    let Json(entries) = payload?;

    let response = orchestrator.score_json(&entries).await?;
    Ok(Json(response))
}
