//! Push-based streaming decompressor.
//!
//! Compressed bytes are pushed in as they arrive (network chunks, cached
//! blob slices); decompressed bytes come back synchronously, in push order,
//! with no relationship assumed between input and output chunk sizes. The
//! component never blocks and never buffers the whole file.

use tracing::debug;
use zstd::stream::raw::{InBuffer, Operation, OutBuffer};

use crate::error::{CodecError, Result};

/// Output scratch size per decode step.
const DECODE_CHUNK: usize = 16 * 1024;

/// Decoder lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeState {
    /// No input pushed yet.
    #[default]
    Idle,
    /// Input has been pushed and more is accepted.
    Decoding,
    /// Finished cleanly; no further input accepted.
    Done,
    /// A decode error occurred; no further input or output.
    Failed,
}

/// Incremental zstd decoder over pushed input.
///
/// `push` feeds compressed bytes and returns whatever decompressed output
/// became available; `finish` seals the stream. The decoder tracks frame
/// completion, so input that ends mid-frame (truncated or aborted
/// transfer) is rejected at `finish` instead of passing as a clean end.
/// Any error is terminal.
pub struct StreamingDecompressor {
    state: DecodeState,
    decoder: Option<zstd::stream::raw::Decoder<'static>>,
    // Hint from the last decode step; zero exactly at a frame boundary.
    last_hint: usize,
    bytes_in: u64,
    bytes_out: u64,
}

impl StreamingDecompressor {
    /// Create an idle decoder.
    pub fn new() -> Result<Self> {
        let decoder = zstd::stream::raw::Decoder::new().map_err(CodecError::StreamDecode)?;
        Ok(Self {
            state: DecodeState::Idle,
            decoder: Some(decoder),
            last_hint: 0,
            bytes_in: 0,
            bytes_out: 0,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Total compressed bytes consumed so far.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    /// Total decompressed bytes emitted so far.
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out
    }

    /// Push a chunk of compressed bytes; returns the decompressed bytes made
    /// available by this push, in input order.
    pub fn push(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        match self.state {
            DecodeState::Failed => return Err(CodecError::DecoderFailed),
            DecodeState::Done => return Err(CodecError::DecoderFinished),
            DecodeState::Idle => self.state = DecodeState::Decoding,
            DecodeState::Decoding => {}
        }
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let decoder = self.decoder.as_mut().ok_or(CodecError::DecoderFailed)?;
        let mut out = Vec::new();
        let mut scratch = vec![0u8; DECODE_CHUNK];
        let mut in_buffer = InBuffer::around(input);
        loop {
            let mut out_buffer = OutBuffer::around(&mut scratch[..]);
            let hint = match decoder.run(&mut in_buffer, &mut out_buffer) {
                Ok(hint) => hint,
                Err(e) => {
                    self.fail();
                    return Err(CodecError::StreamDecode(e));
                }
            };
            self.last_hint = hint;
            out.extend_from_slice(out_buffer.as_slice());
            // Keep going until the input is consumed and the decoder has
            // drained its internal buffer (a full scratch may hide more).
            if in_buffer.pos == input.len() && out_buffer.pos() < scratch.len() {
                break;
            }
        }

        self.bytes_in += input.len() as u64;
        self.bytes_out += out.len() as u64;
        Ok(out)
    }

    /// Signal end of input and transition to `Done`.
    ///
    /// Fails if the pushed input stopped mid-frame: a truncated transfer
    /// must surface as a decode error, never as a short success.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        match self.state {
            DecodeState::Failed => return Err(CodecError::DecoderFailed),
            DecodeState::Done => return Err(CodecError::DecoderFinished),
            DecodeState::Idle | DecodeState::Decoding => {}
        }

        if self.bytes_in > 0 && self.last_hint != 0 {
            self.fail();
            return Err(CodecError::StreamDecode(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "compressed stream ends mid-frame",
            )));
        }

        self.decoder = None;
        self.state = DecodeState::Done;
        debug!(
            bytes_in = self.bytes_in,
            bytes_out = self.bytes_out,
            "streaming decode finished"
        );
        Ok(Vec::new())
    }

    fn fail(&mut self) {
        self.state = DecodeState::Failed;
        self.decoder = None;
    }
}
