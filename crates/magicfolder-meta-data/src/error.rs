//! Classified database errors for the data layer
//!
//! SQLite result codes are folded into a small kind taxonomy so callers can
//! decide what is retryable (busy/locked), what is an idempotent no-op
//! (constraint on an upsert), and what must propagate.

use thiserror::Error;

/// Result type alias for data-layer operations
pub type MetaDataResult<T> = Result<T, MetaDataError>;

/// Coarse classification of SQLite failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// SQLITE_BUSY / SQLITE_LOCKED, retryable at the repository layer
    BusyOrLocked,
    /// Constraint violation (unique, foreign key, ...)
    Constraint,
    /// Database or filesystem is read-only
    Readonly,
    /// Disk-level I/O failure
    Io,
    /// Database file could not be opened
    CantOpen,
    /// Disk or database is full
    Full,
    /// Schema changed or statement no longer valid
    Schema,
    /// Anything else
    Generic,
}

impl std::fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::Constraint => "constraint",
            Self::Readonly => "readonly",
            Self::Io => "io",
            Self::CantOpen => "cantopen",
            Self::Full => "full",
            Self::Schema => "schema",
            Self::Generic => "generic",
        };
        write!(f, "{name}")
    }
}

/// Map a rusqlite error onto the kind taxonomy
pub fn classify(error: &rusqlite::Error) -> DbErrorKind {
    use rusqlite::ErrorCode;

    match error.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => DbErrorKind::BusyOrLocked,
        Some(ErrorCode::ConstraintViolation) => DbErrorKind::Constraint,
        Some(ErrorCode::ReadOnly) => DbErrorKind::Readonly,
        Some(ErrorCode::SystemIoFailure) => DbErrorKind::Io,
        Some(ErrorCode::CannotOpen) => DbErrorKind::CantOpen,
        Some(ErrorCode::DiskFull) => DbErrorKind::Full,
        Some(ErrorCode::SchemaChanged) => DbErrorKind::Schema,
        _ => DbErrorKind::Generic,
    }
}

/// Errors from the data layer
#[derive(Debug, Error)]
pub enum MetaDataError {
    /// A classified SQLite failure
    #[error("{operation} failed: ({kind}) {message}")]
    Database {
        operation: &'static str,
        kind: DbErrorKind,
        message: String,
    },

    /// The connection pool has been shut down
    #[error("connection pool is shut down")]
    PoolClosed,

    /// The database key was rejected (wrong key or corrupt file)
    #[error("database key verification failed: {0}")]
    KeyRejected(String),

    /// The OS secret store could not provide a key
    #[error("key provider error: {0}")]
    KeyProvider(String),

    /// No file row exists for the given path or id
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A vector had the wrong dimensionality
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    VectorDimension { expected: usize, actual: usize },

    /// A caller-supplied argument is invalid (zero pool size, bad key format, ...)
    #[error("invalid argument: {0}")]
    Validation(String),

    /// A persisted timestamp could not be parsed
    #[error("timestamp parse error: {0}")]
    Timestamp(String),
}

impl MetaDataError {
    /// Whether the error is a busy/locked condition worth retrying
    pub const fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Database {
                kind: DbErrorKind::BusyOrLocked,
                ..
            }
        )
    }

    /// Whether the error is a constraint violation
    pub const fn is_constraint(&self) -> bool {
        matches!(
            self,
            Self::Database {
                kind: DbErrorKind::Constraint,
                ..
            }
        )
    }
}

/// Surface a malformed persisted value as a row-conversion failure
pub(crate) fn text_conversion_error(
    error: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, error.into())
}

/// Extension trait attaching the failing operation name to rusqlite errors
pub(crate) trait DatabaseErrorExt<T> {
    fn map_db_err(self, operation: &'static str) -> MetaDataResult<T>;
}

impl<T> DatabaseErrorExt<T> for Result<T, rusqlite::Error> {
    fn map_db_err(self, operation: &'static str) -> MetaDataResult<T> {
        self.map_err(|e| MetaDataError::Database {
            operation,
            kind: classify(&e),
            message: e.to_string(),
        })
    }
}
