//! Reversible deflate obfuscation for the `Test` algorithm.
//!
//! Only hides values from casual inspection of the table. Not encryption.

use crate::error::{CryptoError, CryptoResult};
use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

/// Compresses `plaintext` with raw deflate.
pub fn obfuscate(plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Reverses [`obfuscate`].
///
/// The stream must be complete and exactly fill `data`; corrupt blocks,
/// truncated input and trailing bytes all fail.
pub fn deobfuscate(data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut decompress = Decompress::new(false);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).max(64));

    loop {
        let (in_before, out_before) = (decompress.total_in(), decompress.total_out());
        let consumed = in_before as usize;
        let status = decompress
            .decompress_vec(&data[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| CryptoError::Decryption(format!("invalid deflate stream: {}", e)))?;

        if status == Status::StreamEnd {
            if (decompress.total_in() as usize) < data.len() {
                return Err(CryptoError::Decryption(
                    "trailing bytes after deflate stream".to_string(),
                ));
            }
            return Ok(out);
        }
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
            continue;
        }
        let stalled =
            decompress.total_in() == in_before && decompress.total_out() == out_before;
        if decompress.total_in() as usize >= data.len() || stalled {
            return Err(CryptoError::Decryption(
                "truncated deflate stream".to_string(),
            ));
        }
    }
}
