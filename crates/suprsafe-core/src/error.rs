//! Error types for the SuprSafe core library

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Empty or malformed password or key
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Tag verification failed - wrong secret or tampered data
    #[error("Authentication failed - wrong secret or tampered data")]
    Authentication,

    /// Missing or mismatched artifact parts
    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cryptographic error
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Account record not initialized
    #[error("No account password set up - run 'suprsafe init' first")]
    AccountNotInitialized,

    /// The directory's lockout is terminal; its ciphertext has been wiped
    #[error("Directory is locked - encrypted data has been wiped")]
    Locked,
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}
