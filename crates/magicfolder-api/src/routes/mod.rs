//! Route registration

pub mod files;
pub mod health;
pub mod process;
pub mod search;

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;

use crate::state::AppState;

/// Build the full application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::health_check))
        .route("/process_file", post(process::process_file))
        .route("/search", post(search::search))
        .route("/files", get(files::list_files))
        .route(
            "/files/{*path}",
            get(files::get_file).delete(files::delete_file),
        )
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}
