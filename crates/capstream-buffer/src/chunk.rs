//! Line and chunk records for the bounded buffer.

use serde::{Deserialize, Serialize};

/// One line of ingested text.
///
/// `index` is strictly increasing and globally unique per buffer instance.
/// A line is owned exclusively by the chunk it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLine {
    /// Global, strictly increasing line index.
    pub index: u64,
    /// Ingestion timestamp, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Decoded line content, terminator stripped.
    pub content: String,
    /// Byte length of the line as received, terminator included.
    pub raw_bytes: u32,
    /// Id of the chunk holding this line.
    pub chunk_id: u32,
}

/// A fixed-capacity run of consecutive lines.
///
/// Mutable only while it is the current (last) chunk; once `size_bytes`
/// reaches the configured ceiling it is sealed and a new chunk is rolled.
/// Sealed chunks are never mutated, only dropped wholesale by `clear`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataChunk {
    /// Chunk id, increasing in creation order.
    pub id: u32,
    /// Lines held by this chunk, in index order.
    pub lines: Vec<DataLine>,
    /// Sum of `raw_bytes` over `lines`.
    pub size_bytes: u64,
    /// Index of the first line in this chunk.
    pub start_index: u64,
    /// Index of the last line in this chunk.
    pub end_index: u64,
}

impl DataChunk {
    pub(crate) fn new(id: u32, first_index: u64) -> Self {
        Self {
            id,
            lines: Vec::new(),
            size_bytes: 0,
            start_index: first_index,
            end_index: first_index,
        }
    }

    pub(crate) fn push(&mut self, line: DataLine) {
        self.end_index = line.index;
        self.size_bytes += u64::from(line.raw_bytes);
        self.lines.push(line);
    }

    /// True if any line index in `[start, end]` can live in this chunk.
    pub(crate) fn overlaps(&self, start: u64, end: u64) -> bool {
        !self.lines.is_empty() && self.start_index <= end && self.end_index >= start
    }
}
