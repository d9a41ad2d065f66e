//! Live-link transport abstraction.
//!
//! The ingest worker treats the physical link as "a stream yielding byte
//! chunks, cancellable, can report device loss". Faults are decoded by the
//! transport implementation into a closed taxonomy once, at this boundary;
//! the worker never inspects error strings.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

/// Boxed future alias used across the transport seam.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Parity setting for the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

/// Flow-control setting for the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    /// No flow control.
    #[default]
    None,
    /// Hardware (RTS/CTS) flow control.
    Hardware,
}

/// Framing parameters for a serial-like byte link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Symbol rate in baud.
    pub baud_rate: u32,
    /// Data bits per symbol.
    pub data_bits: u8,
    /// Parity mode.
    pub parity: Parity,
    /// Stop bits per symbol.
    pub stop_bits: u8,
    /// Flow-control mode.
    pub flow_control: FlowControl,
    /// Transport-side read buffer size in bytes.
    pub read_buffer_bytes: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            flow_control: FlowControl::None,
            read_buffer_bytes: 64 * 1024,
        }
    }
}

/// Closed fault taxonomy for the live link.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkFault {
    /// Transport buffer overrun.
    #[error("buffer overrun")]
    Overrun,
    /// Framing error on the line.
    #[error("framing error")]
    Framing,
    /// Parity error on the line.
    #[error("parity error")]
    Parity,
    /// Break signal received.
    #[error("break signal")]
    BreakSignal,
    /// The pending read was cancelled on purpose.
    #[error("read cancelled")]
    Cancelled,
    /// The device is gone; the link cannot recover.
    #[error("device disconnected")]
    DeviceLost,
    /// Anything the transport could not classify.
    #[error("link error: {0}")]
    Other(String),
}

impl LinkFault {
    /// Faults recovered locally by releasing and reacquiring the reader.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LinkFault::Overrun | LinkFault::Framing | LinkFault::Parity | LinkFault::BreakSignal
        )
    }
}

/// Exclusive reader over the live byte stream.
///
/// `next_chunk` resolves to `Ok(Some(bytes))` on data, `Ok(None)` on a
/// clean end of stream, or a [`LinkFault`]. Implementations must make
/// `next_chunk` cancel-safe: dropping the returned future must not lose a
/// delivered chunk.
pub trait StreamReader: Send {
    /// Await the next chunk from the link.
    fn next_chunk(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, LinkFault>>;

    /// Unblock a pending `next_chunk` with [`LinkFault::Cancelled`].
    fn cancel(&mut self);
}

/// A live byte-stream source that hands out exclusive readers.
pub trait StreamTransport: Send + Sync {
    /// Acquire a new exclusive reader over the link.
    fn acquire_reader(&self) -> BoxFuture<'_, Result<Box<dyn StreamReader>, LinkFault>>;
}
