//! HTTP error mapping
//!
//! Client mistakes (unknown file, bad arguments, unsupported formats) come
//! back as 400 with a JSON `{error}` body; everything else is a 500.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use magicfolder_meta_data::MetaDataError;
use magicfolder_search::SearchError;

/// Error shape for every handler
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    /// A blocking-task join failure; only happens when a handler panics
    pub fn task_panic() -> Self {
        Self::Internal("internal task failure".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<MetaDataError> for ApiError {
    fn from(error: MetaDataError) -> Self {
        match error {
            MetaDataError::FileNotFound(_)
            | MetaDataError::Validation(_)
            | MetaDataError::VectorDimension { .. } => Self::BadRequest(error.to_string()),
            _ => Self::Internal(error.to_string()),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(error: SearchError) -> Self {
        match error {
            SearchError::Store(store_error) => store_error.into(),
            _ => Self::Internal(error.to_string()),
        }
    }
}
