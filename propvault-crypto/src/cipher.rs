//! Value encryption using AES-128-GCM.
//!
//! Provides authenticated encryption so corrupt or tampered ciphertext is
//! reported instead of decrypting to garbage.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, SALT_SIZE, Salt};
use aes_gcm::{
    Aes128Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use rand::RngCore;

/// Size of nonce in bytes (96 bits for AES-GCM).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Leading format byte of every sealed value.
pub const FORMAT_VERSION: u8 = 1;

const HEADER_SIZE: usize = 1 + SALT_SIZE + NONCE_SIZE;

/// Encrypted data with the metadata needed for decryption.
///
/// The salt identifies which passphrase derivation produced the key, so a
/// value can be decrypted without knowing the session that wrote it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedData {
    /// Salt used to derive the key from the master passphrase.
    pub salt: Salt,
    /// The nonce used for encryption (unique per encryption).
    pub nonce: [u8; NONCE_SIZE],
    /// The encrypted ciphertext (includes auth tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedData {
    /// Size of the encoded value, header included.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.ciphertext.len()
    }

    /// Encodes as `[version][salt][nonce][ciphertext]`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(self.salt.as_bytes());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Decodes the layout written by [`EncryptedData::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < HEADER_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption("data too short".to_string()));
        }
        if bytes[0] != FORMAT_VERSION {
            return Err(CryptoError::Decryption(format!(
                "unsupported format version {}",
                bytes[0]
            )));
        }

        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes[1..1 + SALT_SIZE]);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[1 + SALT_SIZE..HEADER_SIZE]);

        Ok(Self {
            salt: Salt::from_bytes(salt),
            nonce,
            ciphertext: bytes[HEADER_SIZE..].to_vec(),
        })
    }
}

/// Encrypts plaintext using AES-128-GCM.
///
/// `salt` is recorded alongside the ciphertext; it must be the salt that
/// `key` was derived with.
pub fn encrypt(key: &DerivedKey, salt: Salt, plaintext: &[u8]) -> CryptoResult<EncryptedData> {
    let cipher = Aes128Gcm::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedData {
        salt,
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypts ciphertext using AES-128-GCM.
pub fn decrypt(key: &DerivedKey, encrypted: &EncryptedData) -> CryptoResult<Vec<u8>> {
    let cipher = Aes128Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(&encrypted.nonce);

    cipher
        .decrypt(nonce, encrypted.ciphertext.as_ref())
        .map_err(|_| {
            CryptoError::Decryption("decryption failed (wrong key or tampered data)".to_string())
        })
}

/// Encodes arbitrary bytes as standard base64 for a text column.
pub fn encode_base64(bytes: &[u8]) -> String {
    use base64::{Engine, engine::general_purpose::STANDARD};
    STANDARD.encode(bytes)
}

/// Decodes standard base64 text.
pub fn decode_base64(encoded: &str) -> CryptoResult<Vec<u8>> {
    use base64::{Engine, engine::general_purpose::STANDARD};
    STANDARD
        .decode(encoded)
        .map_err(|e| CryptoError::Decryption(format!("invalid base64: {}", e)))
}
