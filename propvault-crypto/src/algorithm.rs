//! Encryption algorithms for property maps.
//!
//! Every persisted property set records the serialized name of the
//! algorithm its values were written with. Those names are part of the
//! on-disk format and must never change.

use crate::error::{CryptoError, CryptoResult};
use crate::master::MasterKey;
use crate::obfuscate;
use std::fmt;
use std::str::FromStr;

/// Algorithm used for every value of one property map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionAlgorithm {
    /// Plain-text map. Never valid on an encrypting path.
    None,
    /// Deflate obfuscation, for tests only.
    Test,
    /// A master key is required but the server has none.
    NoKey,
    /// AES-128-GCM keyed from the master passphrase.
    Aes128,
}

impl EncryptionAlgorithm {
    /// All variants, in declaration order.
    pub const ALL: [EncryptionAlgorithm; 4] = [
        EncryptionAlgorithm::None,
        EncryptionAlgorithm::Test,
        EncryptionAlgorithm::NoKey,
        EncryptionAlgorithm::Aes128,
    ];

    /// Stable tag written to storage.
    pub const fn serialized_name(self) -> &'static str {
        match self {
            EncryptionAlgorithm::None => "None",
            EncryptionAlgorithm::Test => "Test",
            EncryptionAlgorithm::NoKey => "NoKey",
            EncryptionAlgorithm::Aes128 => "AES128",
        }
    }

    /// Reverse of [`EncryptionAlgorithm::serialized_name`]. Case-sensitive.
    pub fn from_serialized_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|algorithm| algorithm.serialized_name() == name)
    }

    /// Whether values under this algorithm are transformed at all.
    pub const fn is_encrypted(self) -> bool {
        !matches!(self, EncryptionAlgorithm::None)
    }

    /// Encrypts `plaintext`.
    ///
    /// `master` is only consulted by [`EncryptionAlgorithm::Aes128`].
    pub fn encrypt(self, master: Option<&MasterKey>, plaintext: &str) -> CryptoResult<Vec<u8>> {
        match self {
            EncryptionAlgorithm::None => Err(plain_text_misuse()),
            EncryptionAlgorithm::Test => obfuscate::obfuscate(plaintext.as_bytes()),
            EncryptionAlgorithm::NoKey => Err(CryptoError::missing_master_key()),
            EncryptionAlgorithm::Aes128 => require(master)?.seal(plaintext.as_bytes()),
        }
    }

    /// Decrypts bytes produced by [`EncryptionAlgorithm::encrypt`].
    pub fn decrypt(self, master: Option<&MasterKey>, data: &[u8]) -> CryptoResult<String> {
        let plaintext = match self {
            EncryptionAlgorithm::None => return Err(plain_text_misuse()),
            EncryptionAlgorithm::Test => obfuscate::deobfuscate(data)?,
            EncryptionAlgorithm::NoKey => return Err(CryptoError::missing_master_key()),
            EncryptionAlgorithm::Aes128 => require(master)?.open(data)?,
        };
        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::Decryption(format!("invalid UTF-8: {}", e)))
    }
}

fn require(master: Option<&MasterKey>) -> CryptoResult<&MasterKey> {
    master.ok_or_else(CryptoError::missing_master_key)
}

fn plain_text_misuse() -> CryptoError {
    CryptoError::InvalidStoreUsage(
        "property map is not encrypted; it belongs to the plain-text store".to_string(),
    )
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.serialized_name())
    }
}

impl FromStr for EncryptionAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_serialized_name(s).ok_or_else(|| CryptoError::UnknownAlgorithm(s.to_string()))
    }
}
