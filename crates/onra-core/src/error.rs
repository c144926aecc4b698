//! Unified error types for the ONRA ecosystem
//!
//! This module provides a common error type [`OnraError`] that can represent
//! errors from any part of the system. Domain-specific error types convert to
//! `OnraError` for uniform handling at API boundaries, and each variant maps
//! to the process exit code the CLI tools report.

use thiserror::Error;

/// Unified error type for all ONRA operations.
#[derive(Error, Debug)]
pub enum OnraError {
    /// I/O errors (file access, network, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Topology structure errors
    #[error("Topology error: {0}")]
    Topology(String),

    /// Solver invocation errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Registry/reservation errors
    #[error("Registry error: {0}")]
    Registry(String),

    /// Durable-store errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using OnraError.
pub type OnraResult<T> = Result<T, OnraError>;

impl OnraError {
    /// Process exit code reported by the CLI tools for this error.
    ///
    /// 1 = usage, 2 = topology/config load failure, 3 = solver tool not
    /// found, 4 = internal consistency violation.
    pub fn exit_code(&self) -> i32 {
        match self {
            OnraError::Config(_) | OnraError::Topology(_) => 2,
            OnraError::Solver(msg) if msg.contains("not found") => 3,
            OnraError::Registry(_) => 4,
            _ => 1,
        }
    }
}

impl From<anyhow::Error> for OnraError {
    fn from(err: anyhow::Error) -> Self {
        OnraError::Other(err.to_string())
    }
}

impl From<String> for OnraError {
    fn from(s: String) -> Self {
        OnraError::Other(s)
    }
}

impl From<&str> for OnraError {
    fn from(s: &str) -> Self {
        OnraError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for OnraError {
    fn from(err: serde_json::Error) -> Self {
        OnraError::Parse(err.to_string())
    }
}
