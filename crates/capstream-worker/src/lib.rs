#![warn(missing_docs)]

//! CapStream worker subsystem: a correlation-id request/response front-end
//! over the codec operations, supporting multiple concurrent in-flight
//! requests on one worker without head-of-line blocking.

pub mod error;
pub mod protocol;
pub mod worker;

pub use error::{Result, WorkerError};
pub use protocol::{WorkerActionKind, WorkerRequest, WorkerResponse, WorkerStatus};
pub use worker::{CodecWorker, WorkerConfig};
