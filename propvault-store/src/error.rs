//! Error types for the storage layer.

use propvault_crypto::CryptoError;
use thiserror::Error;

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Encryption, decryption or configuration failure from the crypto layer.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Property set not found.
    #[error("property set not found: {0}")]
    NotFound(String),

    /// Persisted data that cannot be interpreted.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl StoreError {
    /// Writes attempted without a usable master key.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, StoreError::Crypto(CryptoError::Configuration(_)))
    }

    /// A map routed to the wrong store.
    pub fn is_invalid_store_usage(&self) -> bool {
        matches!(self, StoreError::Crypto(CryptoError::InvalidStoreUsage(_)))
    }

    /// Ciphertext that could not be turned back into a value.
    pub fn is_decryption_error(&self) -> bool {
        matches!(self, StoreError::Crypto(CryptoError::Decryption(_)))
    }
}
