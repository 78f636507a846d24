//! Error types for CinderKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::protocol::DecodeError;

/// Result type alias using CinderError
pub type Result<T> = std::result::Result<T, CinderError>;

/// Unified error type for CinderKV operations
#[derive(Debug, Error)]
pub enum CinderError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A SimpleError reply returned by a server
    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Append-only log Errors
    // -------------------------------------------------------------------------
    #[error("AOF corrupted at offset {offset}: {source}")]
    LogCorrupted {
        offset: u64,
        #[source]
        source: DecodeError,
    },

    #[error("AOF record at offset {offset} is a {kind}, expected array")]
    LogRecord { offset: u64, kind: &'static str },

    #[error("AOF write failed: {0}")]
    LogWrite(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
