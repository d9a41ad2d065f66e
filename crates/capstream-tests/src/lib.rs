//! CapStream test and validation crate.
//!
//! Cross-crate integration suites and property-based coverage that would
//! not fit naturally in any one subsystem crate: codec round-trips against
//! the frame index, buffer backpressure scenarios, worker correlation
//! under concurrency, archive partial success, cache eviction ordering,
//! and a full capture-to-export pipeline.

pub mod harness;

pub use harness::{init_tracing, random_bytes, sensor_capture};

#[cfg(test)]
mod buffer_tests;
#[cfg(test)]
mod pipeline_integration;
#[cfg(test)]
mod worker_tests;
