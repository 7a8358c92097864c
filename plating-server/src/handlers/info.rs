use axum::{Json, extract::State};
use plating_core::api::{HealthResponse, ServiceInfo};
use tracing::debug;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::current())
}

pub async fn health(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let scorer = state.model.scorer().map_err(|err| {
        debug!(error = %err, "health check without a loaded model");
        AppError::model_unavailable()
    })?;
    Ok(Json(HealthResponse::healthy(scorer.name())))
}
