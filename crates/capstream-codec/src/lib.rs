#![warn(missing_docs)]

//! CapStream codec subsystem: frame-indexed zstd encoding for random-access
//! partial reads, push-based streaming decompression, line reassembly, and
//! content fingerprinting for upload deduplication.

pub mod compress;
pub mod error;
pub mod frame;
pub mod hash;
pub mod lines;
pub mod stream;

pub use compress::{compress_framed, decompress_frame, CompressConfig, FramedBlob};
pub use error::{CodecError, Result};
pub use frame::{FrameIndex, FrameIndexEntry, FRAME_INDEX_VERSION};
pub use hash::{hash_bytes, hash_content, ContentDigest, DEFAULT_HASH_SLICE_SIZE};
pub use lines::{LineDecoder, LineSplitter};
pub use stream::{DecodeState, StreamingDecompressor};
