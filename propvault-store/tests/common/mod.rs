//! Shared test helpers for property store tests.

#![allow(dead_code)]

use propvault_crypto::{KdfParams, MasterKey};
use propvault_store::{
    EncryptedPropertyStore, NormalPropertyStore, PropertyManager, PropertyScope, SqliteBackend,
};
use std::sync::Arc;

/// Fast KDF params for testing (low memory/iterations for speed).
pub fn fast_kdf_params() -> KdfParams {
    KdfParams {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    }
}

pub fn master_key(passphrase: &str) -> Arc<MasterKey> {
    Arc::new(MasterKey::with_params(passphrase, fast_kdf_params()).unwrap())
}

pub fn scope(owner: &str, category: &str) -> PropertyScope {
    PropertyScope::new(owner, category)
}

pub fn encrypted_manager(
    backend: &SqliteBackend,
    passphrase: Option<&str>,
) -> PropertyManager<EncryptedPropertyStore> {
    let store = EncryptedPropertyStore::new(passphrase.map(master_key));
    PropertyManager::new(backend.clone(), Arc::new(store))
}

pub fn normal_manager(backend: &SqliteBackend) -> PropertyManager<NormalPropertyStore> {
    PropertyManager::new(backend.clone(), Arc::new(NormalPropertyStore::new()))
}
