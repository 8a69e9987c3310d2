//! Error types for release-store

use thiserror::Error;

/// Errors surfaced by every [`Driver`](crate::Driver) implementation.
///
/// The set is closed and backend-neutral: backend failures are flattened
/// into [`StoreError::Backend`] so no database-specific type crosses the
/// contract boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Key string is not of the form `<name>.v<version>`
    #[error("invalid release key: {key:?}")]
    InvalidKey { key: String },

    /// No row matched the key (or label query)
    #[error("release not found: {key}")]
    ReleaseNotFound { key: String },

    /// A row with this key already exists
    #[error("release already exists: {key}")]
    ReleaseExists { key: String },

    /// Release could not be turned into a storage body
    #[error("encoding release failed: {0}")]
    Encode(String),

    /// Storage body could not be turned back into a release
    #[error("decoding release failed: {0}")]
    Decode(String),

    /// Label value does not fit the field's type
    #[error("invalid value {value:?} for label {field}")]
    InvalidLabel { field: String, value: String },

    /// Label name outside the fixed field set (only under `UnknownLabels::Reject`)
    #[error("unknown label: {field}")]
    UnknownLabel { field: String },

    /// Driver or connection configuration is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Database connection error
    #[error("database connection failed: {0}")]
    Connection(String),

    /// Schema setup error
    #[error("schema setup failed: {0}")]
    SchemaSetup(String),

    /// Any other backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::ReleaseNotFound { .. })
    }

    pub fn is_exists(&self) -> bool {
        matches!(self, StoreError::ReleaseExists { .. })
    }
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
