//! Server-wide master key.
//!
//! Owns the master passphrase and hands out Argon2id-derived AES keys.
//! Writers always use the session salt picked at construction; readers use
//! whatever salt the ciphertext carries. Derived keys are cached per salt so
//! the KDF runs once per distinct salt rather than once per value.

use crate::cipher::{self, EncryptedData};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KdfParams, Salt, derive_key};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use zeroize::Zeroizing;

/// Upper bound on cached salts. When full, everything but the session salt
/// is evicted.
const MAX_CACHED_KEYS: usize = 64;

/// Passphrase-derived key material shared by every encrypted property map.
pub struct MasterKey {
    passphrase: Zeroizing<String>,
    params: KdfParams,
    session_salt: Salt,
    derived: Mutex<HashMap<Salt, DerivedKey>>,
}

impl MasterKey {
    /// Creates a master key with default KDF parameters.
    pub fn new(passphrase: &str) -> CryptoResult<Self> {
        Self::with_params(passphrase, KdfParams::default())
    }

    /// Creates a master key with explicit KDF parameters.
    pub fn with_params(passphrase: &str, params: KdfParams) -> CryptoResult<Self> {
        if passphrase.trim().is_empty() {
            return Err(CryptoError::missing_master_key());
        }
        Ok(Self {
            passphrase: Zeroizing::new(passphrase.to_string()),
            params,
            session_salt: Salt::random(),
            derived: Mutex::new(HashMap::new()),
        })
    }

    /// KDF parameters in use.
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Encrypts `plaintext`, returning the self-describing byte layout.
    pub fn seal(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let key = self.key_for(self.session_salt)?;
        let encrypted = cipher::encrypt(&key, self.session_salt, plaintext)?;
        Ok(encrypted.to_bytes())
    }

    /// Decrypts bytes produced by [`MasterKey::seal`] under the same passphrase.
    pub fn open(&self, sealed: &[u8]) -> CryptoResult<Vec<u8>> {
        let encrypted = EncryptedData::from_bytes(sealed)?;
        let key = self.key_for(encrypted.salt)?;
        cipher::decrypt(&key, &encrypted)
    }

    fn key_for(&self, salt: Salt) -> CryptoResult<DerivedKey> {
        if let Some(key) = self.cache()?.get(&salt) {
            return Ok(key.clone());
        }

        // Derive without holding the cache lock.
        debug!("deriving master key for new salt");
        let key = derive_key(&self.passphrase, &salt, &self.params)?;

        let mut cache = self.cache()?;
        if cache.len() >= MAX_CACHED_KEYS && !cache.contains_key(&salt) {
            let session = self.session_salt;
            cache.retain(|cached, _| *cached == session);
        }
        cache.insert(salt, key.clone());
        Ok(key)
    }

    fn cache(&self) -> CryptoResult<MutexGuard<'_, HashMap<Salt, DerivedKey>>> {
        self.derived
            .lock()
            .map_err(|_| CryptoError::KeyDerivation("derived key cache poisoned".to_string()))
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("passphrase", &"[REDACTED]")
            .field("params", &self.params)
            .finish()
    }
}
