//! File processing trigger

use std::path::Path;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use magicfolder_meta_data::{BasicFileMetadata, PROCESS_FILE_TASK, TaskEnqueue};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessFileRequest {
    pub file_path: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessFileResponse {
    pub message: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
}

/// `POST /process_file`: create (or coalesce) a PROCESS_FILE task
///
/// The file stub is upserted first so the pipeline can resolve it; a task
/// already outstanding for the same path is reported, not duplicated.
pub async fn process_file(
    State(state): State<AppState>,
    Json(request): Json<ProcessFileRequest>,
) -> Result<Json<ProcessFileResponse>, ApiError> {
    let outcome = tokio::task::spawn_blocking(move || {
        let path = request.file_path;
        let stub = BasicFileMetadata::from_fs(Path::new(&path))
            .map_err(|e| ApiError::BadRequest(format!("cannot read file '{path}': {e}")))?;
        state.store.upsert_file_stub(&stub)?;
        let enqueued = state.queue.create_task(PROCESS_FILE_TASK, &path, 10)?;
        Ok::<_, ApiError>((path, enqueued))
    })
    .await
    .map_err(|_| ApiError::task_panic())??;

    let (path, enqueued) = outcome;
    info!(path, "process_file request accepted");
    let response = match enqueued {
        TaskEnqueue::Created(task_id) => ProcessFileResponse {
            message: format!("processing queued for '{path}'"),
            status: "queued".to_string(),
            task_id: Some(task_id),
        },
        TaskEnqueue::AlreadyQueued => ProcessFileResponse {
            message: format!("a task for '{path}' is already outstanding"),
            status: "already_queued".to_string(),
            task_id: None,
        },
    };
    Ok(Json(response))
}
