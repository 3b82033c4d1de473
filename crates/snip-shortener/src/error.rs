use snip_core::{ErrorKind, StorageError, Token};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    /// The URL is already shortened; carries the token that owns it.
    #[error("url already shortened as {0}")]
    UrlExists(Token),
    #[error("url has been deleted: {0}")]
    UrlDeleted(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no free token after {0} attempts")]
    TokenExhausted(usize),
    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl ShortenerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShortenerError::UrlExists(_) => ErrorKind::UrlExists,
            ShortenerError::UrlDeleted(_) => ErrorKind::UrlDeleted,
            ShortenerError::NotFound(_) => ErrorKind::NotFound,
            ShortenerError::InvalidInput(_) => ErrorKind::InvalidInput,
            ShortenerError::TokenExhausted(_) => ErrorKind::TokenTaken,
            ShortenerError::Storage(err) => err.kind(),
        }
    }

    /// The existing token, for a URL that was already shortened.
    pub fn existing_token(&self) -> Option<&Token> {
        match self {
            ShortenerError::UrlExists(token) => Some(token),
            _ => None,
        }
    }
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::InvalidInput(message) => Self::InvalidInput(message),
            StorageError::UrlDeleted(message) => Self::UrlDeleted(message),
            StorageError::NotFound(message) => Self::NotFound(message),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_sentinels_are_lifted() {
        let err: ShortenerError = StorageError::UrlDeleted("abc".into()).into();
        assert!(matches!(err, ShortenerError::UrlDeleted(_)));

        let err: ShortenerError = StorageError::NotFound("abc".into()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn transient_storage_errors_keep_io_kind() {
        let err: ShortenerError = StorageError::Timeout("5s".into()).into();
        assert!(matches!(err, ShortenerError::Storage(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn url_exists_exposes_token() {
        let token = Token::new_unchecked("abc123");
        let err = ShortenerError::UrlExists(token.clone());
        assert_eq!(err.existing_token(), Some(&token));
        assert_eq!(err.kind(), ErrorKind::UrlExists);
    }
}
