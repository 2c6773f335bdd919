// src/error.rs

use std::fmt;
use std::io;

/// Error type for trapwire operations.
///
/// Configuration and input problems are normally recovered close to where
/// they occur (defaults, absent bounds); the variants here are what remains
/// once recovery is impossible.
#[derive(Debug)]
pub enum TrapwireError {
    /// Unusable configuration that has no defaulting path
    Config(String),
    /// Malformed caller input
    Input(String),
    /// Log-store or config-store collaborator failure
    Store(String),
    /// IO-related errors
    Io(io::Error),
    /// JSON encoding/decoding errors
    Serde(serde_json::Error),
}

impl fmt::Display for TrapwireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrapwireError::Config(e) => write!(f, "Config error: {}", e),
            TrapwireError::Input(e) => write!(f, "Input error: {}", e),
            TrapwireError::Store(e) => write!(f, "Store error: {}", e),
            TrapwireError::Io(e) => write!(f, "IO error: {}", e),
            TrapwireError::Serde(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for TrapwireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrapwireError::Io(e) => Some(e),
            TrapwireError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TrapwireError {
    fn from(err: io::Error) -> Self {
        TrapwireError::Io(err)
    }
}

impl From<serde_json::Error> for TrapwireError {
    fn from(err: serde_json::Error) -> Self {
        TrapwireError::Serde(err)
    }
}

impl From<sled::Error> for TrapwireError {
    fn from(err: sled::Error) -> Self {
        TrapwireError::Store(err.to_string())
    }
}

/// Result type for trapwire operations
pub type Result<T> = std::result::Result<T, TrapwireError>;
