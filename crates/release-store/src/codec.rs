//! Release body encoding
//!
//! A stored body is `base64(zstd(json(release)))`. Decoding sniffs the zstd
//! frame magic, so bodies written as plain base64 JSON remain readable.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{StoreError, StoreResult};
use crate::release::Release;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];
const COMPRESSION_LEVEL: i32 = 3;

/// Encode a release into an opaque storage body.
pub fn encode_release(release: &Release) -> StoreResult<String> {
    let json = serde_json::to_vec(release).map_err(|e| StoreError::Encode(e.to_string()))?;
    let compressed = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| StoreError::Encode(e.to_string()))?;
    Ok(BASE64.encode(compressed))
}

/// Decode a storage body produced by [`encode_release`].
pub fn decode_release(body: &str) -> StoreResult<Release> {
    let bytes = BASE64
        .decode(body.trim())
        .map_err(|e| StoreError::Decode(format!("base64: {e}")))?;

    let json = if bytes.starts_with(&ZSTD_MAGIC) {
        zstd::decode_all(bytes.as_slice()).map_err(|e| StoreError::Decode(format!("zstd: {e}")))?
    } else {
        bytes
    };

    serde_json::from_slice(&json).map_err(|e| StoreError::Decode(format!("json: {e}")))
}
