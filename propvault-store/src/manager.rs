//! Loading and saving property maps through a [`PropertyStore`].

use crate::backend::{self, PropertySetInfo, SqliteBackend};
use crate::error::{StoreError, StoreResult};
use crate::map::{PropertyMap, PropertyScope};
use crate::store::{EncryptedPropertyStore, PropertyStore};
use propvault_crypto::{CryptoError, EncryptionAlgorithm, MasterKey};
use std::sync::Arc;
use tracing::{debug, info};

/// Reads and writes property maps of one store.
///
/// Construct one manager per store over a shared [`SqliteBackend`].
pub struct PropertyManager<S: PropertyStore> {
    backend: SqliteBackend,
    store: Arc<S>,
}

impl<S: PropertyStore> Clone for PropertyManager<S> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PropertyStore> PropertyManager<S> {
    pub fn new(backend: SqliteBackend, store: Arc<S>) -> Self {
        Self { backend, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> &SqliteBackend {
        &self.backend
    }

    /// Read-only snapshot of the properties for `scope`.
    ///
    /// Returns an empty map tagged with the preferred algorithm when nothing
    /// has been saved yet.
    pub fn get_properties(&self, scope: &PropertyScope) -> StoreResult<PropertyMap> {
        match self.load(scope)? {
            Some(map) => Ok(map),
            None => Ok(PropertyMap::new(
                scope.clone(),
                self.store.preferred_encryption(),
            )),
        }
    }

    /// Properties for `scope` that may be modified and saved.
    ///
    /// With `create`, a missing set yields a new map under the preferred
    /// algorithm; without it, a missing set yields `None`.
    pub fn get_writable_properties(
        &self,
        scope: &PropertyScope,
        create: bool,
    ) -> StoreResult<Option<PropertyMap>> {
        self.store.validate_configuration()?;
        match self.load(scope)? {
            Some(map) => Ok(Some(map)),
            None if create => Ok(Some(PropertyMap::new(
                scope.clone(),
                self.store.preferred_encryption(),
            ))),
            None => Ok(None),
        }
    }

    /// Persists `map` in one transaction and returns its set id.
    ///
    /// Every entry is rewritten in map order; names removed since load are
    /// deleted. A scope without a persisted set only accepts maps tagged with
    /// the store's preferred algorithm.
    pub fn save(&self, map: &mut PropertyMap) -> StoreResult<i64> {
        self.store.validate_configuration()?;
        self.check_map(map)?;
        if map.encryption() == EncryptionAlgorithm::NoKey {
            return Err(StoreError::Crypto(CryptoError::missing_master_key()));
        }

        let values = map
            .iter()
            .map(|(name, value)| Ok((name.to_string(), self.store.serialize_for_save(map, value)?)))
            .collect::<StoreResult<Vec<_>>>()?;

        let scope = map.scope().clone();
        let encryption = map.encryption();
        let preferred = self.store.preferred_encryption();
        let known_set = map.set_id();
        let removed = map.removed().to_vec();

        let set_id = self.backend.transaction(|tx| {
            let set_id = match known_set {
                Some(set_id) if backend::set_exists(tx, set_id)? => set_id,
                _ => match backend::find_set(tx, &scope)? {
                    Some(existing) if existing.encryption == encryption => existing.set_id,
                    Some(existing) => {
                        return Err(StoreError::InvalidData(format!(
                            "property set {} already exists with encryption {}",
                            scope, existing.encryption
                        )));
                    }
                    None if encryption == preferred => {
                        backend::insert_set(tx, &scope, encryption)?
                    }
                    None => {
                        return Err(StoreError::Crypto(CryptoError::InvalidStoreUsage(format!(
                            "new property set {} must use encryption {}, not {}",
                            scope, preferred, encryption
                        ))));
                    }
                },
            };
            for name in &removed {
                backend::delete_row(tx, set_id, name)?;
            }
            for (seq, (name, value)) in values.iter().enumerate() {
                backend::upsert_row(tx, set_id, name, value.as_deref(), seq as i64)?;
            }
            Ok(set_id)
        })?;

        debug!(
            "saved {} properties ({} removed) for {}",
            values.len(),
            removed.len(),
            scope
        );
        map.mark_saved(set_id);
        Ok(set_id)
    }

    /// Deletes every property of `scope`. Returns whether anything existed.
    ///
    /// Like every write, refused when the store is misconfigured.
    pub fn delete_properties(&self, scope: &PropertyScope) -> StoreResult<bool> {
        self.store.validate_configuration()?;
        if let Some(info) = self.backend.find_set(scope)? {
            self.check_tag(&info)?;
        }
        let deleted = self.backend.delete_set(scope)?;
        if deleted {
            debug!("deleted property set {}", scope);
        }
        Ok(deleted)
    }

    /// Persisted sets that belong to this store.
    pub fn list_scopes(&self, category: Option<&str>) -> StoreResult<Vec<PropertySetInfo>> {
        Ok(self
            .backend
            .list_sets(category)?
            .into_iter()
            .filter(|info| self.accepts(info.encryption))
            .collect())
    }

    fn load(&self, scope: &PropertyScope) -> StoreResult<Option<PropertyMap>> {
        let Some(info) = self.backend.find_set(scope)? else {
            return Ok(None);
        };
        self.check_tag(&info)?;

        let rows = self.backend.load_rows(info.set_id)?;
        debug!("loaded {} properties for {}", rows.len(), scope);
        let mut map = PropertyMap::persisted(scope.clone(), info.set_id, info.encryption);
        self.store.populate_from_rows(rows, &mut map)?;
        Ok(Some(map))
    }

    fn accepts(&self, encryption: EncryptionAlgorithm) -> bool {
        self.store
            .is_valid_map(&PropertyMap::new(PropertyScope::new("", ""), encryption))
    }

    fn check_tag(&self, info: &PropertySetInfo) -> StoreResult<()> {
        if self.accepts(info.encryption) {
            Ok(())
        } else {
            Err(wrong_store(&info.scope, info.encryption))
        }
    }

    fn check_map(&self, map: &PropertyMap) -> StoreResult<()> {
        if self.store.is_valid_map(map) {
            Ok(())
        } else {
            Err(wrong_store(map.scope(), map.encryption()))
        }
    }
}

impl PropertyManager<EncryptedPropertyStore> {
    /// Re-encrypts every `AES128` set written under `previous` with the
    /// current master key, in one transaction. Returns the number of sets
    /// rewritten.
    ///
    /// Sets already readable with the current key are left untouched.
    pub fn rekey(&self, previous: &MasterKey) -> StoreResult<usize> {
        self.store.validate_configuration()?;
        let current = self
            .store
            .master_key()
            .cloned()
            .ok_or_else(|| StoreError::Crypto(CryptoError::missing_master_key()))?;

        let rewritten = self.backend.transaction(|tx| {
            let mut rewritten = 0;
            for info in backend::list_sets(tx, None)? {
                if info.encryption != EncryptionAlgorithm::Aes128 {
                    continue;
                }
                let rows = backend::load_rows(tx, info.set_id)?;
                if readable_with(&current, &rows) {
                    continue;
                }
                for (name, value) in rows {
                    let Some(encoded) = value else { continue };
                    let plaintext = EncryptedPropertyStore::open_value(
                        Some(previous),
                        EncryptionAlgorithm::Aes128,
                        &encoded,
                    )?;
                    let sealed = self
                        .store
                        .seal_value(EncryptionAlgorithm::Aes128, &plaintext)?;
                    backend::update_value(tx, info.set_id, &name, Some(&sealed))?;
                }
                rewritten += 1;
            }
            Ok(rewritten)
        })?;

        info!("re-encrypted {} property sets with the current master key", rewritten);
        Ok(rewritten)
    }
}

fn readable_with(master: &MasterKey, rows: &[(String, Option<String>)]) -> bool {
    rows.iter()
        .filter_map(|(_, value)| value.as_deref())
        .all(|encoded| {
            EncryptedPropertyStore::open_value(Some(master), EncryptionAlgorithm::Aes128, encoded)
                .is_ok()
        })
}

fn wrong_store(scope: &PropertyScope, encryption: EncryptionAlgorithm) -> StoreError {
    StoreError::Crypto(CryptoError::InvalidStoreUsage(format!(
        "property set {} uses encryption {} which this store does not handle",
        scope, encryption
    )))
}
