//! Server configuration.
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! [storage]
//! database_path = "propvault.db"
//!
//! [encryption]
//! master_key = "a long passphrase"
//!
//! [encryption.kdf]
//! memory_cost = 19456
//! time_cost = 2
//! parallelism = 1
//! ```
//!
//! `PROPVAULT_MASTER_KEY` in the environment overrides `encryption.master_key`.

use crate::error::{StoreError, StoreResult};
use propvault_crypto::{KdfParams, MasterKey};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Environment variable overriding the configured master key.
pub const MASTER_KEY_ENV: &str = "PROPVAULT_MASTER_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub storage: StorageSettings,
    pub encryption: EncryptionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database_path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("propvault.db"),
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct EncryptionSettings {
    pub master_key: Option<String>,
    pub kdf: KdfSettings,
}

impl std::fmt::Debug for EncryptionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionSettings")
            .field("master_key", &self.master_key.as_ref().map(|_| "[REDACTED]"))
            .field("kdf", &self.kdf)
            .finish()
    }
}

/// Argon2id tuning for master key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KdfSettings {
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfSettings {
    fn default() -> Self {
        let params = KdfParams::default();
        Self {
            memory_cost: params.memory_cost,
            time_cost: params.time_cost,
            parallelism: params.parallelism,
        }
    }
}

impl From<&KdfSettings> for KdfParams {
    fn from(settings: &KdfSettings) -> Self {
        KdfParams {
            memory_cost: settings.memory_cost,
            time_cost: settings.time_cost,
            parallelism: settings.parallelism,
        }
    }
}

impl ServerConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml(text: &str) -> StoreResult<Self> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Reads configuration from a file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        debug!("loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Applies the environment override for the master key.
    pub fn apply_env(self) -> Self {
        self.with_master_key_override(std::env::var(MASTER_KEY_ENV).ok())
    }

    /// Replaces the master key when `value` is present.
    pub fn with_master_key_override(mut self, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.encryption.master_key = Some(value);
        }
        self
    }

    /// The configured master passphrase, exactly as written. Blank values
    /// count as unset.
    pub fn master_key(&self) -> Option<&str> {
        self.encryption
            .master_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Whether a master passphrase is configured.
    pub fn has_master_key(&self) -> bool {
        self.master_key().is_some()
    }

    /// Builds the shared master key, if one is configured.
    pub fn build_master_key(&self) -> StoreResult<Option<Arc<MasterKey>>> {
        self.master_key()
            .map(|passphrase| {
                MasterKey::with_params(passphrase, KdfParams::from(&self.encryption.kdf))
                    .map(Arc::new)
                    .map_err(StoreError::from)
            })
            .transpose()
    }
}
