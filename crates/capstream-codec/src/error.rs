use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode frame {frame}: {source}")]
    FrameEncode {
        frame: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode frame {frame}: {source}")]
    FrameDecode {
        frame: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("decompression stream error: {0}")]
    StreamDecode(#[source] std::io::Error),

    #[error("decoder is in a failed state; no further input accepted")]
    DecoderFailed,

    #[error("decoder already finished")]
    DecoderFinished,

    #[error("frame index entry {entry} is not contiguous in {space} space")]
    IndexNotContiguous { entry: usize, space: &'static str },

    #[error("frame index size mismatch: {field} is {recorded} but entries sum to {actual}")]
    IndexSizeMismatch {
        field: &'static str,
        recorded: u64,
        actual: u64,
    },

    #[error("unsupported frame index version {0}")]
    UnsupportedVersion(u32),

    #[error("frame index serialization error: {0}")]
    IndexSerialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
