#![warn(missing_docs)]

//! CapStream ingest subsystem: an isolated read loop over a live byte link
//! with fault classification, transient recovery, and batched line delivery.

pub mod transport;
pub mod worker;

pub use transport::{
    BoxFuture, FlowControl, LinkConfig, LinkFault, Parity, StreamReader, StreamTransport,
};
pub use worker::{spawn, IngestConfig, IngestEvent, IngestHandle};
