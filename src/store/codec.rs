use std::io::Read;

use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression as FlateCompression;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Compression scheme applied to each chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Chunk payloads are stored raw
    None,
    /// Chunk payloads are gzip streams
    Gzip,
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
        }
    }
}

/// Compress a raw chunk payload for storage.
pub fn compress_chunk(compression: Compression, raw: &[u8]) -> Result<Vec<u8>, StoreError> {
    match compression {
        Compression::None => Ok(raw.to_vec()),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(raw, FlateCompression::default());
            let mut stored = Vec::new();
            encoder
                .read_to_end(&mut stored)
                .map_err(|e| StoreError::Decompress(format!("gzip encode failed: {e}")))?;
            Ok(stored)
        }
    }
}

/// Decompress a stored chunk payload and validate its decoded length.
///
/// The chunk table records the raw length of every chunk, so a mismatch
/// after decoding means the payload or the table is corrupt.
pub fn decompress_chunk(
    compression: Compression,
    stored: &[u8],
    expected_len: usize,
) -> Result<Vec<u8>, StoreError> {
    let raw = match compression {
        Compression::None => stored.to_vec(),
        Compression::Gzip => {
            let mut decoder = GzDecoder::new(stored);
            let mut raw = Vec::with_capacity(expected_len);
            decoder
                .read_to_end(&mut raw)
                .map_err(|e| StoreError::Decompress(format!("gzip decode failed: {e}")))?;
            raw
        }
    };

    if raw.len() != expected_len {
        return Err(StoreError::Decompress(format!(
            "decoded {} bytes, chunk table says {}",
            raw.len(),
            expected_len
        )));
    }
    Ok(raw)
}
