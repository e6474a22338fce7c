//! Error types for PipeDB
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using PipeDbError
pub type Result<T> = std::result::Result<T, PipeDbError>;

/// Unified error type for PipeDB operations
#[derive(Debug, Error)]
pub enum PipeDbError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    /// Malformed line. `line` is 1-based, or 0 for a standalone parse.
    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Invalid record key: {0}")]
    InvalidKey(String),

    /// A type, name or value the line format cannot store
    #[error("Invalid field: {0}")]
    InvalidField(String),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    /// Lock protocol misuse. Treat as a programming error.
    #[error("Lock state error: {0}")]
    LockState(String),
}

impl PipeDbError {
    /// Build a parse error that is not yet tied to a line number
    pub fn parse(reason: impl Into<String>) -> Self {
        PipeDbError::Parse {
            line: 0,
            reason: reason.into(),
        }
    }

    /// Attach a 1-based line number to a parse error; other errors pass through
    pub fn at_line(self, lineno: usize) -> Self {
        match self {
            PipeDbError::Parse { reason, .. } => PipeDbError::Parse {
                line: lineno,
                reason,
            },
            other => other,
        }
    }
}
