//! Encryption layer for PropVault.
//!
//! # Architecture
//!
//! - [`EncryptionAlgorithm`] is the per-map tag persisted with every property set
//! - [`MasterKey`] derives AES-128 keys from the server-wide passphrase (Argon2id)
//! - Ciphertext is authenticated (AES-GCM), so corruption surfaces as an error

mod algorithm;
mod cipher;
mod error;
mod key;
mod master;
mod obfuscate;

pub use algorithm::EncryptionAlgorithm;
pub use cipher::{
    EncryptedData, FORMAT_VERSION, NONCE_SIZE, TAG_SIZE, decode_base64, decrypt, encode_base64,
    encrypt,
};
pub use error::{CryptoError, CryptoResult, MISSING_MASTER_KEY_MESSAGE};
pub use key::{DerivedKey, KEY_SIZE, KdfParams, SALT_SIZE, Salt, derive_key};
pub use master::MasterKey;
pub use obfuscate::{deobfuscate, obfuscate};
