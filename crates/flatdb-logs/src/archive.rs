//! Archive codec: gzip, then standard padded base64.
//!
//! ```text
//! <archive_id>.gz.b64   base64(gzip(topic bytes))
//! ```
//!
//! Decoding also accepts a zlib stream in place of gzip, and ignores
//! surrounding whitespace in the base64 text.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::{MultiGzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{LogError, LogResult};

/// Extension of archive files.
pub const ARCHIVE_EXTENSION: &str = "gz.b64";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compress and encode raw topic bytes into archive text.
pub fn encode(data: &[u8]) -> LogResult<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| LogError::CompressionFailed(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| LogError::CompressionFailed(e.to_string()))?;
    Ok(STANDARD.encode(compressed))
}

/// Decode and inflate archive text back to the original topic text.
pub fn decode(text: &str) -> LogResult<String> {
    let compressed = STANDARD
        .decode(text.trim())
        .map_err(|e| LogError::Decode(e.to_string()))?;

    let mut inflated = Vec::new();
    let result = if compressed.starts_with(&GZIP_MAGIC) {
        MultiGzDecoder::new(compressed.as_slice()).read_to_end(&mut inflated)
    } else {
        ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut inflated)
    };
    result.map_err(|e| LogError::DecompressionFailed(e.to_string()))?;

    String::from_utf8(inflated).map_err(|e| LogError::Decode(e.to_string()))
}
