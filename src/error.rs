//! Brickyard Error Types

use thiserror::Error;

/// Result type alias for Brickyard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Brickyard error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Entry errors
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    // Store errors
    #[error("Store error: {0}")]
    Store(String),

    #[error("Entry {bucket}/{id} corrupted: {reason}")]
    Corrupted {
        bucket: &'static str,
        id: String,
        reason: String,
    },

    #[error("Write attempted in a read-only transaction")]
    ReadOnly,

    #[error("Entry serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Collaborator errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Allocator error: {0}")]
    Allocator(String),
}

/// Coarse error classification used at the request boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced entity is absent
    NotFound,
    /// Operation would violate referential integrity
    Conflict,
    /// Malformed input
    ValidationFailure,
    /// Serialization, I/O, or transaction-layer fault
    StoreFailure,
}

impl Error {
    /// Shorthand for a missing entry of the given kind
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Validation(_) => ErrorKind::ValidationFailure,
            Error::Config(_)
            | Error::ConfigParse(_)
            | Error::Store(_)
            | Error::Corrupted { .. }
            | Error::ReadOnly
            | Error::Serialization(_)
            | Error::Io(_)
            | Error::Network(_)
            | Error::Allocator(_) => ErrorKind::StoreFailure,
        }
    }

    /// Check if this error means the entry does not exist
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this error is an integrity conflict
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Store(format!("SQLite error: {}", e))
    }
}
