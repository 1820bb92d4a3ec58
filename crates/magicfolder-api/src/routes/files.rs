//! File listing, lookup, and deletion

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use serde_json::json;

use magicfolder_common::FileType;
use magicfolder_meta_data::{
    FileMetadata, MetadataStore, ProcessingStatus, models::format_timestamp,
};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FileDto {
    pub id: i64,
    pub path: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub processing_status: ProcessingStatus,
    pub content_hash: String,
    pub created_at: String,
    pub last_modified: String,
    pub tags: String,
    pub suggested_category: String,
    pub suggested_filename: String,
}

impl From<FileMetadata> for FileDto {
    fn from(file: FileMetadata) -> Self {
        Self {
            id: file.id,
            path: file.path,
            file_type: file.file_type,
            file_size: file.file_size,
            processing_status: file.processing_status,
            content_hash: file.content_hash,
            created_at: format_timestamp(file.created_at),
            last_modified: format_timestamp(file.last_modified),
            tags: file.tags,
            suggested_category: file.suggested_category,
            suggested_filename: file.suggested_filename,
        }
    }
}

/// `GET /files`: every indexed file
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileDto>>, ApiError> {
    let store = Arc::clone(&state.store);
    let files = tokio::task::spawn_blocking(move || store.list_all_files())
        .await
        .map_err(|_| ApiError::task_panic())??;
    Ok(Json(files.into_iter().map(FileDto::from).collect()))
}

/// `GET /files/{path}`: one file by path
pub async fn get_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<FileDto>, ApiError> {
    let store = Arc::clone(&state.store);
    let file = tokio::task::spawn_blocking(move || lookup(&store, &path))
        .await
        .map_err(|_| ApiError::task_panic())??;
    Ok(Json(FileDto::from(file)))
}

/// `DELETE /files/{path}`: remove a file row and its chunks
pub async fn delete_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = Arc::clone(&state.store);
    let deleted_path = tokio::task::spawn_blocking(move || {
        let file = lookup(&store, &path)?;
        store.delete_file_metadata(&file.path)?;
        Ok::<_, ApiError>(file.path)
    })
    .await
    .map_err(|_| ApiError::task_panic())??;
    Ok(Json(json!({ "message": format!("deleted '{deleted_path}'") })))
}

/// Wildcard captures drop the leading slash; accept the path either way
fn lookup(store: &MetadataStore, path: &str) -> Result<FileMetadata, ApiError> {
    if let Some(file) = store.get_file_metadata(path)? {
        return Ok(file);
    }
    let prefixed = format!("/{path}");
    if let Some(file) = store.get_file_metadata(&prefixed)? {
        return Ok(file);
    }
    Err(ApiError::BadRequest(format!("file not found: {path}")))
}
