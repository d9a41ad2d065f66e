use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache root {0:?} could not be prepared: {1}")]
    RootUnavailable(PathBuf, #[source] std::io::Error),

    #[error("failed to persist cache record {key:?}: {source}")]
    Persist {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache record serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
