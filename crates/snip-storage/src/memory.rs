use crate::index::BaseIndex;
use async_trait::async_trait;
use jiff::Timestamp;
use parking_lot::RwLock;
use snip_core::error::{Result, StorageError};
use snip_core::{Repository, StorageType, Token, UrlRecord};
use std::collections::HashMap;
use tracing::trace;

/// Volatile implementation of the storage contract.
///
/// One reader-writer lock covers the forward map and both reverse maps,
/// so every operation is linearizable with respect to the others.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    index: RwLock<BaseIndex>,
}

impl MemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Validates and stores a single record, returning what was stored.
    pub(crate) fn insert(
        &self,
        token: &Token,
        original_url: &str,
        user_id: &str,
        created_at: Option<Timestamp>,
    ) -> Result<UrlRecord> {
        if token.is_empty() || original_url.is_empty() {
            return Err(StorageError::InvalidInput(
                "token and url cannot be empty".to_string(),
            ));
        }

        let mut index = self.index.write();

        if index.contains(token) {
            return Err(StorageError::TokenTaken(token.to_string()));
        }

        if index.live_token_by_url(original_url).is_some() {
            return Err(StorageError::UrlExists(original_url.to_string()));
        }

        let mut record = UrlRecord::new(token.clone(), original_url, user_id);
        record.created_at = created_at;
        index.set(record.clone());

        trace!(token = %token, "stored url record");
        Ok(record)
    }

    /// Stores every pair without duplicate checks and returns the new records.
    ///
    /// Batch records carry no owner.
    pub(crate) fn insert_batch(
        &self,
        urls: &HashMap<Token, String>,
        created_at: Option<Timestamp>,
    ) -> Vec<UrlRecord> {
        let mut index = self.index.write();
        let mut stored = Vec::with_capacity(urls.len());

        for (token, original_url) in urls {
            let mut record = UrlRecord::new(token.clone(), original_url.as_str(), "");
            record.created_at = created_at;
            index.set(record.clone());
            stored.push(record);
        }

        stored
    }

    /// Tombstones the tokens owned by `user_id`; returns how many flipped.
    pub(crate) fn tombstone(&self, user_id: &str, tokens: &[Token]) -> usize {
        if tokens.is_empty() {
            return 0;
        }

        let mut index = self.index.write();
        let mut flipped = 0;

        for token in tokens {
            let Some(record) = index.get(token) else {
                continue;
            };
            if record.user_id != user_id || record.is_deleted {
                continue;
            }

            let mut record = record.clone();
            record.is_deleted = true;
            index.set(record);
            flipped += 1;
        }

        flipped
    }

    /// Puts a record back exactly as given, bypassing every check.
    pub(crate) fn restore(&self, record: UrlRecord) {
        self.index.write().set(record);
    }

    /// Every record, in an order whose replay rebuilds the same index.
    pub(crate) fn snapshot(&self) -> Vec<UrlRecord> {
        self.index
            .read()
            .replay_order()
            .into_iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn add_url(&self, token: &Token, original_url: &str, user_id: &str) -> Result<()> {
        self.insert(token, original_url, user_id, None).map(|_| ())
    }

    async fn get_url(&self, token: &Token) -> Result<String> {
        let index = self.index.read();

        let Some(record) = index.get(token) else {
            return Err(StorageError::NotFound(token.to_string()));
        };

        if record.is_deleted {
            return Err(StorageError::UrlDeleted(token.to_string()));
        }

        Ok(record.original_url.clone())
    }

    async fn get_token_by_url(&self, original_url: &str) -> Result<Token> {
        self.index
            .read()
            .token_by_url(original_url)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(original_url.to_string()))
    }

    async fn get_user_urls(&self, user_id: &str) -> Result<Vec<UrlRecord>> {
        let index = self.index.read();
        Ok(index
            .records()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_url_batch(&self, urls: &HashMap<Token, String>) -> Result<()> {
        self.insert_batch(urls, None);
        Ok(())
    }

    async fn delete_urls(&self, user_id: &str, tokens: &[Token]) -> Result<()> {
        self.tombstone(user_id, tokens);
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}
