//! Frame-indexed encoder: slices the input into fixed-size frames and
//! compresses each one as an independent, self-terminating zstd frame.
//!
//! Because every frame is compressed without carried state, any single
//! frame can be decompressed in isolation using only the offsets in the
//! index. Concatenated frames also form a valid zstd stream, so the whole
//! blob remains consumable by the streaming decoder.

use std::io::Read;

use tracing::debug;

use crate::error::{CodecError, Result};
use crate::frame::{FrameIndex, FrameIndexEntry, FRAME_INDEX_VERSION};

/// Default decompressed frame size: 2 MiB.
pub const DEFAULT_FRAME_SIZE: usize = 2 * 1024 * 1024;

/// Default zstd compression level.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Configuration for the frame encoder.
#[derive(Debug, Clone)]
pub struct CompressConfig {
    /// Decompressed bytes per frame (default 2 MiB).
    pub frame_size: usize,
    /// zstd compression level (default 3).
    pub level: i32,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// An encoded file: the compressed blob plus its frame index.
#[derive(Debug, Clone)]
pub struct FramedBlob {
    /// Concatenated independently-compressed frames.
    pub data: Vec<u8>,
    /// Offset metadata for every frame.
    pub index: FrameIndex,
}

/// Compress a byte source into the framed format.
///
/// Reads `min(frame_size, remaining)` bytes per slice. If compression of
/// any slice fails the whole encode is aborted and the error names the
/// frame ordinal; no partial index is returned.
pub fn compress_framed<R: Read>(mut reader: R, config: &CompressConfig) -> Result<FramedBlob> {
    let frame_size = config.frame_size.max(1);
    let mut slice = vec![0u8; frame_size];
    let mut data = Vec::new();
    let mut entries = Vec::new();
    let mut decompressed_cursor = 0u64;
    let mut frame_ordinal = 0usize;

    loop {
        let filled = read_full(&mut reader, &mut slice)?;
        if filled == 0 {
            break;
        }

        let compressed = zstd::bulk::compress(&slice[..filled], config.level)
            .map_err(|source| CodecError::FrameEncode {
                frame: frame_ordinal,
                source,
            })?;

        entries.push(FrameIndexEntry {
            compressed_start: data.len() as u64,
            compressed_length: compressed.len() as u64,
            decompressed_start: decompressed_cursor,
            decompressed_length: filled as u64,
        });
        data.extend_from_slice(&compressed);
        decompressed_cursor += filled as u64;
        frame_ordinal += 1;

        if filled < frame_size {
            break;
        }
    }

    let index = FrameIndex {
        version: FRAME_INDEX_VERSION,
        frame_size: frame_size as u64,
        original_size: decompressed_cursor,
        compressed_size: data.len() as u64,
        entries,
    };

    debug!(
        frames = index.len(),
        original_size = index.original_size,
        compressed_size = index.compressed_size,
        "framed encode complete"
    );

    Ok(FramedBlob { data, index })
}

/// Decompress a single frame out of a compressed blob using its index entry.
///
/// Only the bytes in `[compressed_start, compressed_start + compressed_length)`
/// are touched; the frame decodes in isolation.
pub fn decompress_frame(blob: &[u8], index: &FrameIndex, frame: usize) -> Result<Vec<u8>> {
    let entry = index
        .entries
        .get(frame)
        .copied()
        .ok_or(CodecError::FrameDecode {
            frame,
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "frame out of range"),
        })?;

    let start = entry.compressed_start as usize;
    let end = start
        .checked_add(entry.compressed_length as usize)
        .ok_or(CodecError::FrameDecode {
            frame,
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "frame bounds overflow"),
        })?;
    let region = blob
        .get(start..end)
        .ok_or(CodecError::FrameDecode {
            frame,
            source: std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "blob shorter than index claims",
            ),
        })?;

    zstd::bulk::decompress(region, entry.decompressed_length as usize).map_err(|source| {
        CodecError::FrameDecode { frame, source }
    })
}

// Read until the buffer is full or the source is exhausted. A short read
// from the source is not end-of-input.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
