use crate::error::ShortenerError;
use snip_core::{Repository, StorageError, Token};
use snip_generator::Generator;
use std::sync::Arc;
use tracing::debug;

/// How many fresh tokens `encode` tries before giving up on collisions.
pub const MAX_TOKEN_ATTEMPTS: usize = 3;

/// Encodes and decodes URLs against a repository.
///
/// The repository is the source of truth for uniqueness. The generator only
/// proposes tokens; a collision reported by storage triggers a retry.
#[derive(Debug)]
pub struct ShortenerService<R, G> {
    repository: Arc<R>,
    generator: Arc<G>,
}

impl<R, G> Clone for ShortenerService<R, G> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            generator: Arc::clone(&self.generator),
        }
    }
}

impl<R: Repository, G: Generator> ShortenerService<R, G> {
    pub fn new(repository: R, generator: G) -> Self {
        Self::from_shared(Arc::new(repository), Arc::new(generator))
    }

    /// Builds a service over a repository that is also used elsewhere.
    pub fn from_shared(repository: Arc<R>, generator: Arc<G>) -> Self {
        Self {
            repository,
            generator,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Shortens `url` on behalf of `user_id`.
    ///
    /// If the URL is already known, returns `Err(UrlExists(token))` with the
    /// token that owns it, so callers can answer with a conflict that still
    /// carries the short form.
    pub async fn encode(&self, url: &str, user_id: &str) -> Result<Token, ShortenerError> {
        if url.is_empty() {
            return Err(ShortenerError::InvalidInput(
                "url cannot be empty".to_string(),
            ));
        }

        if let Some(existing) = self.lookup(url).await? {
            return Err(ShortenerError::UrlExists(existing));
        }

        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let token = self.generator.generate();

            match self.repository.add_url(&token, url, user_id).await {
                Ok(()) => {
                    debug!(token = %token, user_id, "shortened url");
                    return Ok(token);
                }
                Err(StorageError::UrlExists(_)) => {
                    // Lost a race with a concurrent writer of the same URL.
                    let existing = self.repository.get_token_by_url(url).await?;
                    return Err(ShortenerError::UrlExists(existing));
                }
                Err(StorageError::TokenTaken(_)) => {
                    debug!(token = %token, attempt, "token collision, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ShortenerError::TokenExhausted(MAX_TOKEN_ATTEMPTS))
    }

    /// Resolves `token` to its original URL.
    pub async fn decode(&self, token: &Token) -> Result<String, ShortenerError> {
        Ok(self.repository.get_url(token).await?)
    }

    async fn lookup(&self, url: &str) -> Result<Option<Token>, ShortenerError> {
        match self.repository.get_token_by_url(url).await {
            Ok(token) => Ok(Some(token)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
