//! Search endpoint

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use magicfolder_common::FileType;
use magicfolder_meta_data::ProcessingStatus;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct FileHit {
    pub id: i64,
    pub path: String,
    pub distance: f32,
    pub file_type: FileType,
    pub processing_status: ProcessingStatus,
}

#[derive(Debug, Serialize)]
pub struct ChunkHit {
    pub id: i64,
    pub file_id: i64,
    pub chunk_index: i64,
    pub distance: f32,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponseBody {
    pub query: String,
    pub file_results: Vec<FileHit>,
    pub chunk_results: Vec<ChunkHit>,
}

/// `POST /search`: top-k files and chunks for a natural-language query
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponseBody>, ApiError> {
    if request.query.is_empty() {
        return Err(ApiError::BadRequest("query cannot be empty".to_string()));
    }
    let top_k = request.top_k.unwrap_or(DEFAULT_TOP_K);

    let search_service = Arc::clone(&state.search);
    let query = request.query.clone();
    let results = tokio::task::spawn_blocking(move || search_service.search(&query, top_k))
        .await
        .map_err(|_| ApiError::task_panic())??;

    let file_results = results
        .file_results
        .into_iter()
        .map(|hit| FileHit {
            id: hit.id,
            path: hit.file.path,
            distance: hit.distance,
            file_type: hit.file.file_type,
            processing_status: hit.file.processing_status,
        })
        .collect();
    let chunk_results = results
        .chunk_results
        .into_iter()
        .map(|hit| ChunkHit {
            id: hit.id,
            file_id: hit.file_id,
            chunk_index: hit.chunk_index,
            distance: hit.distance,
            content: hit.content,
        })
        .collect();

    Ok(Json(SearchResponseBody {
        query: request.query,
        file_results,
        chunk_results,
    }))
}
