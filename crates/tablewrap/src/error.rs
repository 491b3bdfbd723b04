//! Error types and store error classification for tablewrap

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Result type alias for tablewrap operations
pub type TableResult<T> = Result<T, TableError>;

/// Error types for table operations
#[derive(Debug, Error)]
pub enum TableError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Single-row fetch matched no row
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Write violated a unique constraint
    #[error("Duplicated unique key: {0}")]
    DuplicatedUniqueKey(String),

    /// Bulk insert batch with inconsistent key sets
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Malformed JSON payload or a column value of the wrong type
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid input rejected before any statement reached the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Any other store or transport failure, passed through unchanged
    #[error("{0}")]
    Unclassified(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl TableError {
    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode_column(column: &str, message: impl std::fmt::Display) -> Self {
        Self::Decode(format!("column '{column}': {message}"))
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a duplicated unique key error
    pub fn is_duplicated_unique_key(&self) -> bool {
        matches!(self, Self::DuplicatedUniqueKey(_))
    }

    /// Check if this is a schema mismatch error
    pub fn is_schema_mismatch(&self) -> bool {
        matches!(self, Self::SchemaMismatch(_))
    }

    /// Check if this is a decode error
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl From<serde_json::Error> for TableError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for TableError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

/// A store-native error that can be inspected for the signals the classifier cares about.
///
/// Implement this once per supported store; [`classify`] only ever talks to this trait.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
    /// The store rejected a write because of a unique constraint.
    fn is_unique_violation(&self) -> bool;

    /// The store reported that a single-row fetch matched nothing.
    fn is_no_rows(&self) -> bool {
        false
    }
}

impl StoreError for tokio_postgres::Error {
    fn is_unique_violation(&self) -> bool {
        self.code() == Some(&SqlState::UNIQUE_VIOLATION)
    }
}

/// What kind of call produced a store error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Multi-row read.
    Read,
    /// Single-row fetch.
    FetchOne,
    /// Any statement that writes.
    Write,
}

/// Map a store error onto the portable taxonomy.
///
/// Runs once per call, right after the executor returns.
pub fn classify<E: StoreError>(err: E, access: Access) -> TableError {
    match access {
        Access::Write if err.is_unique_violation() => {
            TableError::DuplicatedUniqueKey(err.to_string())
        }
        Access::FetchOne if err.is_no_rows() => TableError::NotFound(err.to_string()),
        _ => TableError::Unclassified(Box::new(err)),
    }
}
