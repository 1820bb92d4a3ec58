//! Common utilities shared across Magic Folder crates
//!
//! This crate provides the content codec (hashing + compression) used by the
//! processing pipeline and search path, the shared file-type vocabulary, and
//! process-wide environment bootstrap.

pub mod codec;
pub mod types;

pub use codec::{CodecError, CodecResult, compress, decompress, hash_content};
pub use types::FileType;

use std::sync::Once;

static ENV_INIT: Once = Once::new();

/// Load `.env` into the process environment, once.
///
/// Safe to call from every binary entry point; later calls are no-ops.
pub fn initialize_environment() {
    ENV_INIT.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}
