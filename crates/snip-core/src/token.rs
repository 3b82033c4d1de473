use crate::error::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A short token identifying one shortened URL.
///
/// Tokens are 1-10 ASCII alphanumeric characters. Generated tokens are
/// always 6-9 characters long; the wider range accepts hand-written tokens
/// arriving from clients.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

pub const MIN_LENGTH: usize = 1;
pub const MAX_LENGTH: usize = 10;

impl Token {
    /// Creates a new `Token` after validating the input.
    ///
    /// Valid tokens are 1-10 characters and contain only `[a-zA-Z0-9]`.
    pub fn new(token: impl Into<String>) -> std::result::Result<Self, StorageError> {
        let token = token.into();
        Self::validate(&token)?;
        Ok(Self(token))
    }

    /// Creates a `Token` without validation.
    ///
    /// Use this only for tokens produced by trusted internal sources
    /// (generators, rows read back from storage).
    pub fn new_unchecked(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generates the full short URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(token: &str) -> std::result::Result<(), StorageError> {
        if token.len() < MIN_LENGTH || token.len() > MAX_LENGTH {
            return Err(StorageError::InvalidInput(format!(
                "token length must be between {} and {}, got {}",
                MIN_LENGTH,
                MAX_LENGTH,
                token.len()
            )));
        }

        if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StorageError::InvalidInput(format!(
                "token must contain only alphanumeric characters: '{}'",
                token
            )));
        }

        Ok(())
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
