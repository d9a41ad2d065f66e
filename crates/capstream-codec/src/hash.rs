//! Content fingerprinting for upload deduplication.
//!
//! A single incremental BLAKE3 context is fed fixed-size slices of the
//! source, so peak memory stays bounded by the slice size while the digest
//! depends only on the logical byte sequence. This is a dedup fingerprint,
//! not a cryptographic integrity guarantee.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Slice size for hashing: 20 MiB. Larger than the compression frame size
/// to keep the per-slice digest call overhead low.
pub const DEFAULT_HASH_SLICE_SIZE: usize = 20 * 1024 * 1024;

/// A 32-byte BLAKE3 digest identifying a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    /// Return the digest as a lowercase hex string
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
    /// Return the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Hash a byte source by streaming slices of `slice_size` bytes through one
/// incremental digest context.
pub fn hash_content<R: Read>(mut reader: R, slice_size: usize) -> Result<ContentDigest> {
    let slice_size = slice_size.max(1);
    let mut hasher = blake3::Hasher::new();
    let mut slice = vec![0u8; slice_size];
    loop {
        let n = match reader.read(&mut slice) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&slice[..n]);
    }
    Ok(ContentDigest(*hasher.finalize().as_bytes()))
}

/// Hash an in-memory buffer.
pub fn hash_bytes(data: &[u8]) -> ContentDigest {
    ContentDigest(*blake3::hash(data).as_bytes())
}
