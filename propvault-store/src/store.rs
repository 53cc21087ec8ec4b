//! Property stores: the policy deciding how values reach the table.
//!
//! A store owns the translation between in-memory values and the text
//! column, and guards every write path with a configuration check.
//! [`NormalPropertyStore`] writes values as-is; [`EncryptedPropertyStore`]
//! encrypts under each map's own algorithm and base64-encodes the result.

use crate::error::{StoreError, StoreResult};
use crate::map::PropertyMap;
use propvault_crypto::{
    CryptoError, EncryptionAlgorithm, MasterKey, decode_base64, encode_base64,
};
use std::sync::Arc;
use tracing::{info, warn};

/// One persisted property row: `(name, value)`.
pub type PropertyRow = (String, Option<String>);

/// How property values are written to and read from the backing table.
pub trait PropertyStore: Send + Sync {
    /// Fails unless this store may be used for writes.
    fn validate_configuration(&self) -> StoreResult<()>;

    /// Whether `map` belongs to this store.
    fn is_valid_map(&self, map: &PropertyMap) -> bool;

    /// Algorithm assigned to newly created maps.
    fn preferred_encryption(&self) -> EncryptionAlgorithm;

    /// Converts a value into the text stored in the `value` column.
    fn serialize_for_save(&self, map: &PropertyMap, value: Option<&str>)
    -> StoreResult<Option<String>>;

    /// Inserts persisted rows into `map`, in row order.
    ///
    /// Any row that cannot be read aborts the whole population.
    fn populate_from_rows<I>(&self, rows: I, map: &mut PropertyMap) -> StoreResult<()>
    where
        I: IntoIterator<Item = PropertyRow>;
}

/// Plain-text store. Maps carry [`EncryptionAlgorithm::None`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalPropertyStore;

impl NormalPropertyStore {
    pub fn new() -> Self {
        Self
    }
}

impl PropertyStore for NormalPropertyStore {
    fn validate_configuration(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_valid_map(&self, map: &PropertyMap) -> bool {
        map.encryption() == EncryptionAlgorithm::None
    }

    fn preferred_encryption(&self) -> EncryptionAlgorithm {
        EncryptionAlgorithm::None
    }

    fn serialize_for_save(
        &self,
        _map: &PropertyMap,
        value: Option<&str>,
    ) -> StoreResult<Option<String>> {
        Ok(value.map(str::to_owned))
    }

    fn populate_from_rows<I>(&self, rows: I, map: &mut PropertyMap) -> StoreResult<()>
    where
        I: IntoIterator<Item = PropertyRow>,
    {
        for (name, value) in rows {
            map.load_entry(name, value);
        }
        Ok(())
    }
}

/// Store whose values are encrypted at rest.
///
/// The preferred algorithm is fixed at construction: `AES128` when a master
/// key is supplied, `NoKey` otherwise. Maps loaded from storage keep the tag
/// they were written with.
#[derive(Debug, Clone)]
pub struct EncryptedPropertyStore {
    master: Option<Arc<MasterKey>>,
    preferred: EncryptionAlgorithm,
}

impl EncryptedPropertyStore {
    pub fn new(master: Option<Arc<MasterKey>>) -> Self {
        let preferred = if master.is_some() {
            info!("encrypted property store using {}", EncryptionAlgorithm::Aes128);
            EncryptionAlgorithm::Aes128
        } else {
            warn!("no master encryption key configured; encrypted properties are read-only");
            EncryptionAlgorithm::NoKey
        };
        Self { master, preferred }
    }

    /// Store backed by `master`.
    pub fn with_master_key(master: Arc<MasterKey>) -> Self {
        Self::new(Some(master))
    }

    /// Store for a deployment without a master key.
    pub fn without_master_key() -> Self {
        Self::new(None)
    }

    pub fn master_key(&self) -> Option<&Arc<MasterKey>> {
        self.master.as_ref()
    }

    /// Encrypts `value` under `algorithm` and base64-encodes it.
    pub(crate) fn seal_value(
        &self,
        algorithm: EncryptionAlgorithm,
        value: &str,
    ) -> StoreResult<String> {
        let ciphertext = algorithm.encrypt(self.master.as_deref(), value)?;
        Ok(encode_base64(&ciphertext))
    }

    /// Reverses [`EncryptedPropertyStore::seal_value`] with an explicit key.
    pub(crate) fn open_value(
        master: Option<&MasterKey>,
        algorithm: EncryptionAlgorithm,
        encoded: &str,
    ) -> StoreResult<String> {
        let ciphertext = decode_base64(encoded)?;
        Ok(algorithm.decrypt(master, &ciphertext)?)
    }
}

impl PropertyStore for EncryptedPropertyStore {
    fn validate_configuration(&self) -> StoreResult<()> {
        if self.preferred == EncryptionAlgorithm::Aes128 {
            Ok(())
        } else {
            Err(StoreError::Crypto(CryptoError::missing_master_key()))
        }
    }

    fn is_valid_map(&self, map: &PropertyMap) -> bool {
        map.encryption().is_encrypted()
    }

    fn preferred_encryption(&self) -> EncryptionAlgorithm {
        self.preferred
    }

    fn serialize_for_save(
        &self,
        map: &PropertyMap,
        value: Option<&str>,
    ) -> StoreResult<Option<String>> {
        value
            .map(|value| self.seal_value(map.encryption(), value))
            .transpose()
    }

    fn populate_from_rows<I>(&self, rows: I, map: &mut PropertyMap) -> StoreResult<()>
    where
        I: IntoIterator<Item = PropertyRow>,
    {
        let algorithm = map.encryption();
        let decrypted = rows
            .into_iter()
            .map(|(name, value)| {
                let value = value
                    .map(|encoded| Self::open_value(self.master.as_deref(), algorithm, &encoded))
                    .transpose()?;
                Ok((name, value))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        for (name, value) in decrypted {
            map.load_entry(name, value);
        }
        Ok(())
    }
}
