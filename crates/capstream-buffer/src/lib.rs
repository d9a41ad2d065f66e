#![warn(missing_docs)]

//! CapStream buffer subsystem: size-bounded, chunked accumulation of
//! ingested lines with warning/stop backpressure thresholds.

pub mod buffer;
pub mod chunk;

pub use buffer::{BoundedLineBuffer, BufferConfig, BufferState, BufferStatus};
pub use chunk::{DataChunk, DataLine};
