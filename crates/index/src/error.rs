use std::fmt;

use chainidx_storage::StoreError;

#[derive(Debug)]
pub enum IndexError {
    Store(StoreError),
    /// A stored key or value that should always be well-formed was not.
    Corrupt(&'static str),
    /// One or more batches of a flush failed. The driver must halt.
    FlushFailed(String),
    /// A scan stopped early because shutdown was requested.
    Interrupted,
    Config(String),
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexError::Store(err) => write!(f, "{err}"),
            IndexError::Corrupt(message) => write!(f, "{message}"),
            IndexError::FlushFailed(message) => write!(f, "{message}"),
            IndexError::Interrupted => write!(f, "interrupted by shutdown"),
            IndexError::Config(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IndexError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for IndexError {
    fn from(err: StoreError) -> Self {
        IndexError::Store(err)
    }
}

impl IndexError {
    /// True for errors the block driver must treat as node-halting.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IndexError::Store(_) | IndexError::FlushFailed(_))
    }
}
