//! Line reassembly over a pushed byte stream.
//!
//! Splitting happens at the byte level on `\n` (a `\r` immediately before
//! it is stripped), so multi-byte UTF-8 sequences and partial trailing
//! lines carry over between pushes intact. Only complete lines are ever
//! emitted; `finish` flushes a trailing unterminated line.

use crate::error::Result;
use crate::stream::StreamingDecompressor;

/// Accumulates pushed bytes and yields complete text lines.
#[derive(Debug, Default)]
pub struct LineSplitter {
    carry: Vec<u8>,
    lines_emitted: u64,
}

impl LineSplitter {
    /// Create an empty splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push raw bytes; returns the complete lines they produced, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(bytes);

        let Some(last_newline) = self.carry.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.carry.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.carry, rest);

        // `complete` always ends with '\n', so the final split segment is an
        // empty remainder, not a line.
        let mut segments: Vec<&[u8]> = complete.split(|&b| b == b'\n').collect();
        segments.pop();
        let lines: Vec<String> = segments.into_iter().map(decode_line).collect();

        self.lines_emitted += lines.len() as u64;
        lines
    }

    /// Flush the trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.carry);
        self.lines_emitted += 1;
        Some(decode_line(&tail))
    }

    /// Bytes currently held back as an incomplete line.
    pub fn pending_bytes(&self) -> usize {
        self.carry.len()
    }

    /// Total lines emitted so far.
    pub fn lines_emitted(&self) -> u64 {
        self.lines_emitted
    }
}

fn decode_line(segment: &[u8]) -> String {
    let segment = match segment.last() {
        Some(b'\r') => &segment[..segment.len() - 1],
        _ => segment,
    };
    String::from_utf8_lossy(segment).into_owned()
}

/// Streaming decompressor that forwards complete decompressed text lines.
///
/// Composes [`StreamingDecompressor`] with a [`LineSplitter`]: each push of
/// compressed bytes yields whatever complete lines became decodable, and
/// `finish` flushes both the decoder and the trailing partial line.
pub struct LineDecoder {
    decoder: StreamingDecompressor,
    splitter: LineSplitter,
}

impl LineDecoder {
    /// Create an idle line decoder.
    pub fn new() -> Result<Self> {
        Ok(Self {
            decoder: StreamingDecompressor::new()?,
            splitter: LineSplitter::new(),
        })
    }

    /// Push compressed bytes; returns the complete lines they produced.
    pub fn push(&mut self, input: &[u8]) -> Result<Vec<String>> {
        let decompressed = self.decoder.push(input)?;
        Ok(self.splitter.push(&decompressed))
    }

    /// Seal the stream; returns any remaining lines including a trailing
    /// line that lacked a terminator.
    pub fn finish(&mut self) -> Result<Vec<String>> {
        let decompressed = self.decoder.finish()?;
        let mut lines = self.splitter.push(&decompressed);
        lines.extend(self.splitter.finish());
        Ok(lines)
    }

    /// Underlying decoder state.
    pub fn state(&self) -> crate::stream::DecodeState {
        self.decoder.state()
    }
}
