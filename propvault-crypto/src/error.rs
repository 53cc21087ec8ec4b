//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Remediation shown to administrators when a master key is required but absent.
pub const MISSING_MASTER_KEY_MESSAGE: &str = "no master encryption key is configured; \
     provide a master encryption key in the server configuration \
     (encryption.master_key or PROPVAULT_MASTER_KEY)";

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key, corrupt or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The deployment lacks something an algorithm needs (usually the master key).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A plain-text map was routed through an encrypting code path.
    #[error("invalid store usage: {0}")]
    InvalidStoreUsage(String),

    /// A persisted algorithm tag that no variant owns.
    #[error("unknown encryption algorithm: {0}")]
    UnknownAlgorithm(String),
}

impl CryptoError {
    /// The error raised whenever key material is needed but none is configured.
    pub fn missing_master_key() -> Self {
        Self::Configuration(MISSING_MASTER_KEY_MESSAGE.to_string())
    }
}
