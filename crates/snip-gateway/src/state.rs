use crate::auth::Signer;
use crate::worker::DeleteQueue;
use snip_core::Token;
use snip_generator::RandomGenerator;
use snip_shortener::ShortenerService;
use snip_storage::Storage;
use std::sync::Arc;

pub type Shortener = ShortenerService<Storage, RandomGenerator>;

#[derive(Clone)]
pub struct AppState {
    shortener: Shortener,
    signer: Signer,
    deletes: DeleteQueue,
    base_url: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        shortener: Shortener,
        signer: Signer,
        deletes: DeleteQueue,
        base_url: Option<String>,
    ) -> Self {
        Self {
            shortener,
            signer,
            deletes,
            base_url: base_url.map(Into::into),
        }
    }

    pub fn shortener(&self) -> &Shortener {
        &self.shortener
    }

    pub fn storage(&self) -> &Storage {
        self.shortener.repository()
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn deletes(&self) -> &DeleteQueue {
        &self.deletes
    }

    /// The public short URL for `token`.
    ///
    /// Without a configured base URL, the request's `Host` is used.
    pub fn short_url(&self, token: &Token, host: Option<&str>) -> String {
        match self.base_url.as_deref() {
            Some(base) => token.to_url(base),
            None => format!("http://{}/{}", host.unwrap_or("localhost"), token),
        }
    }
}
