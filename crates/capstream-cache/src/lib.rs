#![warn(missing_docs)]

//! CapStream cache subsystem: a disk-backed cache of compressed captures
//! keyed by file id, rebuilt from its root directory at open and bounded
//! by both record age and total size.

pub mod error;
pub mod store;

pub use error::{CacheError, Result};
pub use store::{CacheConfig, CacheRecord, CacheStats, ContentCache};
