//! SQLite-backed property maps for PropVault.
//!
//! Provides ordered, scoped `name -> value` maps persisted as rows of a
//! relational table, with optional per-map encryption.
//!
//! # Architecture
//!
//! - [`PropertyStore`] decides how values are written to the `value` column:
//!   [`NormalPropertyStore`] as plain text, [`EncryptedPropertyStore`] as
//!   base64 ciphertext under the map's [`EncryptionAlgorithm`]
//! - [`PropertyManager`] loads, saves and deletes maps through one store
//! - [`SqliteBackend`] owns the `property_sets` and `properties` tables
//! - [`ServerConfig`] decides whether a master key exists, which fixes the
//!   encrypted store's preferred algorithm for the life of the process

mod backend;
mod config;
mod error;
mod manager;
mod map;
mod store;

pub use backend::{PropertySetInfo, SqliteBackend};
pub use config::{EncryptionSettings, KdfSettings, MASTER_KEY_ENV, ServerConfig, StorageSettings};
pub use error::{StoreError, StoreResult};
pub use manager::PropertyManager;
pub use map::{PropertyMap, PropertyScope};
pub use propvault_crypto::EncryptionAlgorithm;
pub use store::{EncryptedPropertyStore, NormalPropertyStore, PropertyRow, PropertyStore};

use std::sync::Arc;

/// Both property managers over one database, wired from configuration.
///
/// Built once at startup; the encrypted store's preferred algorithm does not
/// change afterwards.
#[derive(Clone)]
pub struct PropertyServices {
    pub normal: PropertyManager<NormalPropertyStore>,
    pub encrypted: PropertyManager<EncryptedPropertyStore>,
}

impl PropertyServices {
    /// Wires both managers over `backend` using `config` for key material.
    pub fn new(config: &ServerConfig, backend: SqliteBackend) -> StoreResult<Self> {
        let master = config.build_master_key()?;
        Ok(Self {
            normal: PropertyManager::new(backend.clone(), Arc::new(NormalPropertyStore::new())),
            encrypted: PropertyManager::new(backend, Arc::new(EncryptedPropertyStore::new(master))),
        })
    }

    /// Opens the configured database and wires both managers.
    pub fn open(config: &ServerConfig) -> StoreResult<Self> {
        let backend = SqliteBackend::open(&config.storage.database_path)?;
        Self::new(config, backend)
    }
}
