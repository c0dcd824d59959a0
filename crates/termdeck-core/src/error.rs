//! Error types for termdeck.

use thiserror::Error;

use crate::SurfaceId;

/// Main error type for termdeck operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine refused or failed to allocate a surface
    #[error("Engine handle creation failed: {0}")]
    EngineHandleCreation(String),

    /// Ordinal index outside the collection
    #[error("Index {index} out of range (len: {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Collection length at the time of the call
        len: usize,
    },

    /// Surface is not a member of the collection
    #[error("Surface not found: {0}")]
    NotFound(SurfaceId),

    /// Surface handle never initialized or has broken
    #[error("Invalid surface state: {0}")]
    InvalidSurfaceState(SurfaceId),

    /// Session limit reached
    #[error("Session limit reached (max: {0})")]
    SessionLimitReached(usize),

    /// Invalid terminal dimensions
    #[error("Invalid dimensions: {rows}x{cols}")]
    InvalidDimensions {
        /// Number of rows
        rows: u16,
        /// Number of columns
        cols: u16,
    },

    /// Engine operation failed on a live handle
    #[error("Engine error: {0}")]
    Engine(String),

    /// PTY-related errors
    #[error("PTY error: {0}")]
    Pty(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error means the surface must be removed rather than retried.
    pub fn is_fatal_for_surface(&self) -> bool {
        matches!(self, Error::InvalidSurfaceState(_))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
