//! Frame index: per-frame offset metadata enabling random-access partial
//! decompression of an encoded capture file.
//!
//! The index is serialized as JSON and travels alongside the compressed
//! blob. Field names on the wire are the short forms consumed by existing
//! readers (`cs`/`cl`/`ds`/`dl`).

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Current frame index format version.
pub const FRAME_INDEX_VERSION: u32 = 1;

/// Offset metadata for one independently decodable frame, in both the
/// compressed and decompressed coordinate spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameIndexEntry {
    /// Byte offset of this frame within the compressed blob.
    #[serde(rename = "cs")]
    pub compressed_start: u64,
    /// Compressed length of this frame in bytes.
    #[serde(rename = "cl")]
    pub compressed_length: u64,
    /// Byte offset of this frame's data within the original file.
    #[serde(rename = "ds")]
    pub decompressed_start: u64,
    /// Decompressed length of this frame in bytes.
    #[serde(rename = "dl")]
    pub decompressed_length: u64,
}

/// Ordered list of all frames of one encoded file.
///
/// Immutable once produced by the encoder. Entries are contiguous in both
/// coordinate spaces; `validate` checks the invariants after transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameIndex {
    /// Format version.
    pub version: u32,
    /// Target decompressed frame size the encoder sliced with.
    #[serde(rename = "frameSize")]
    pub frame_size: u64,
    /// Total decompressed size of the original file.
    #[serde(rename = "originalSize")]
    pub original_size: u64,
    /// Total size of the compressed blob.
    #[serde(rename = "compressedSize")]
    pub compressed_size: u64,
    /// Per-frame offset metadata, in order.
    #[serde(rename = "frames")]
    pub entries: Vec<FrameIndexEntry>,
}

impl FrameIndex {
    /// Check contiguity and size invariants, naming the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.version != FRAME_INDEX_VERSION {
            return Err(CodecError::UnsupportedVersion(self.version));
        }

        let mut compressed_cursor = 0u64;
        let mut decompressed_cursor = 0u64;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.compressed_start != compressed_cursor {
                return Err(CodecError::IndexNotContiguous {
                    entry: i,
                    space: "compressed",
                });
            }
            if entry.decompressed_start != decompressed_cursor {
                return Err(CodecError::IndexNotContiguous {
                    entry: i,
                    space: "decompressed",
                });
            }
            // Lengths come off the wire; an overflowing sum can never be a
            // contiguous index.
            compressed_cursor = compressed_cursor
                .checked_add(entry.compressed_length)
                .ok_or(CodecError::IndexNotContiguous {
                    entry: i,
                    space: "compressed",
                })?;
            decompressed_cursor = decompressed_cursor
                .checked_add(entry.decompressed_length)
                .ok_or(CodecError::IndexNotContiguous {
                    entry: i,
                    space: "decompressed",
                })?;
        }

        if decompressed_cursor != self.original_size {
            return Err(CodecError::IndexSizeMismatch {
                field: "originalSize",
                recorded: self.original_size,
                actual: decompressed_cursor,
            });
        }
        if compressed_cursor != self.compressed_size {
            return Err(CodecError::IndexSizeMismatch {
                field: "compressedSize",
                recorded: self.compressed_size,
                actual: compressed_cursor,
            });
        }
        Ok(())
    }

    /// Find the frame containing the given decompressed byte offset.
    ///
    /// Returns the entry ordinal, or `None` if the offset is past the end.
    pub fn frame_for_offset(&self, decompressed_offset: u64) -> Option<usize> {
        if decompressed_offset >= self.original_size {
            return None;
        }
        let idx = self.entries.partition_point(|e| {
            e.decompressed_start
                .saturating_add(e.decompressed_length)
                <= decompressed_offset
        });
        (idx < self.entries.len()).then_some(idx)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the index holds no frames.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from the JSON wire form and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let index: FrameIndex = serde_json::from_str(json)?;
        index.validate()?;
        Ok(index)
    }
}
