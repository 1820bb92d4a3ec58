//! HTTP surface for Magic Folder
//!
//! Axum routes over the synchronous core: handlers hop onto the blocking
//! thread pool for store and search calls so the async runtime never stalls
//! on database or embedding work.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
