use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors surfaced by every storage engine.
///
/// The first five variants are part of the storage contract and carry a
/// meaning callers dispatch on. The remaining variants describe transient
/// failures of the backing medium and collapse into [`ErrorKind::Io`].
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("token already exists: {0}")]
    TokenTaken(String),
    #[error("url already exists: {0}")]
    UrlExists(String),
    #[error("url has been deleted: {0}")]
    UrlDeleted(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage i/o failed: {0}")]
    Io(String),
}

/// The sentinel kinds a caller can observe from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    TokenTaken,
    UrlExists,
    UrlDeleted,
    NotFound,
    Io,
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidInput(_) => ErrorKind::InvalidInput,
            StorageError::TokenTaken(_) => ErrorKind::TokenTaken,
            StorageError::UrlExists(_) => ErrorKind::UrlExists,
            StorageError::UrlDeleted(_) => ErrorKind::UrlDeleted,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::Unavailable(_)
            | StorageError::Timeout(_)
            | StorageError::Query(_)
            | StorageError::InvalidData(_)
            | StorageError::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
