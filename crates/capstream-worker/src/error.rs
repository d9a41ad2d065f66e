use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker terminated")]
    Terminated,

    #[error("codec error: {0}")]
    Codec(#[from] capstream_codec::CodecError),

    #[error("job failed: {0}")]
    JobFailed(String),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
