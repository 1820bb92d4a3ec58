//! Search orchestration: natural-language query to file and chunk hits
//!
//! One query embedding serves both granularities: files come from the
//! summary-vector index, chunks from the chunk vectors of the matched files.

pub mod error;
pub mod service;

pub use error::{SearchError, SearchResult};
pub use service::{ChunkHit, SearchResponse, SearchService};
