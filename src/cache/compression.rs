//! Compression Policy Module
//!
//! Decides which payloads are worth compressing and provides the gzip codec
//! used both for cached entries and for compressed transfer bodies.

use std::io::{Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use thiserror::Error;

// == Constants ==
/// Default minimum payload size before compression is attempted.
pub const DEFAULT_MIN_COMPRESS_SIZE: u64 = 1024;

/// Content-type prefixes that are considered compressible.
const COMPRESSIBLE_PREFIXES: &[&str] = &[
    "text/",
    "application/json",
    "application/javascript",
    "application/xml",
    "application/yaml",
    "image/svg",
];

// == Codec Error ==
/// Failure of a compression or decompression transform.
#[derive(Error, Debug)]
#[error("codec failure: {0}")]
pub struct CodecError(#[from] std::io::Error);

// == Compression Policy ==
/// Pure decision function over content type and size.
#[derive(Debug, Clone, Copy)]
pub struct CompressionPolicy {
    /// Payloads smaller than this are never compressed
    pub min_size: u64,
}

impl CompressionPolicy {
    pub fn new(min_size: u64) -> Self {
        Self { min_size }
    }

    // == Should Compress ==
    /// Returns true when the payload is large enough and of a textual type.
    ///
    /// Binary, image (except SVG) and video types are never compressed.
    pub fn should_compress(&self, content_type: &str, size: u64) -> bool {
        if size < self.min_size {
            return false;
        }
        COMPRESSIBLE_PREFIXES
            .iter()
            .any(|prefix| content_type.starts_with(prefix))
    }
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_COMPRESS_SIZE)
    }
}

// == Codec ==
/// Compresses bytes with gzip at the default level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompresses gzip bytes. Exact inverse of [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = GzDecoder::new(data);
    let mut output = Vec::new();
    decoder.read_to_end(&mut output)?;
    Ok(output)
}
