use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("source for entry {identifier:?} could not be opened: {message}")]
    SourceUnavailable { identifier: String, message: String },

    #[error("codec error: {0}")]
    Codec(#[from] capstream_codec::CodecError),

    #[error("archive write error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
