//! Error types for depot sessions, transfers and clients.

use std::path::PathBuf;

/// Errors produced by the depot library.
#[derive(Debug, thiserror::Error)]
pub enum DepotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("transfer ended early: received {received} of {expected} bytes")]
    PrematureEof { expected: u64, received: u64 },

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("remote file not found: {0}")]
    RemoteNotFound(String),

    #[error("local file not found: {}", .0.display())]
    LocalNotFound(PathBuf),

    #[error("server rejected request: {0}")]
    Rejected(String),

    #[error("credential store error: {0}")]
    Credentials(String),
}

impl DepotError {
    /// True when the error leaves the connection unusable and the session must end.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            DepotError::Io(_) | DepotError::ConnectionClosed | DepotError::PrematureEof { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DepotError>;
