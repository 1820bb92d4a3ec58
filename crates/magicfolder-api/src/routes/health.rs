//! Health endpoint

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: String,
    pub status: String,
    pub version: String,
}

/// `GET /`: liveness plus a probe of the embedding server
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let embedder = Arc::clone(&state.embedder);
    let embedding_up = tokio::task::spawn_blocking(move || embedder.is_server_available())
        .await
        .map_err(|_| ApiError::task_panic())?;

    Ok(Json(HealthResponse {
        message: "Magic Folder API is running".to_string(),
        status: if embedding_up { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
