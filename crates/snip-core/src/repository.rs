use crate::error::Result;
use crate::token::Token;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;
use uuid::Uuid;

/// A stored URL record, shared by every storage engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Identifier assigned at creation.
    pub id: Uuid,
    /// The short token.
    pub token: Token,
    /// The original URL that was shortened.
    pub original_url: String,
    /// The user who created the record.
    pub user_id: String,
    /// Soft-delete tombstone. Never reverts to `false`.
    pub is_deleted: bool,
    /// When the record was created. Only persistent engines stamp it.
    pub created_at: Option<Timestamp>,
}

impl UrlRecord {
    /// Creates a live record with a fresh id and no creation timestamp.
    pub fn new(token: Token, original_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            token,
            original_url: original_url.into(),
            user_id: user_id.into(),
            is_deleted: false,
            created_at: None,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.is_deleted
    }
}

/// Which engine backs a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageType {
    Memory,
    File,
    Database,
}

impl Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Memory => f.write_str("memory"),
            StorageType::File => f.write_str("file"),
            StorageType::Database => f.write_str("database"),
        }
    }
}

/// The storage contract every engine implements.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Inserts a new record owned by `user_id`.
    ///
    /// Returns `Err(InvalidInput)` for an empty token or URL,
    /// `Err(TokenTaken)` if the token is already used and `Err(UrlExists)`
    /// if a live record with the same URL exists.
    async fn add_url(&self, token: &Token, original_url: &str, user_id: &str) -> Result<()>;

    /// Resolves a token to its original URL.
    ///
    /// Returns `Err(UrlDeleted)` for tombstoned records and `Err(NotFound)`
    /// for unknown tokens.
    async fn get_url(&self, token: &Token) -> Result<String>;

    /// Returns the token most recently stored for `original_url`.
    async fn get_token_by_url(&self, original_url: &str) -> Result<Token>;

    /// Lists every record created by `user_id`, tombstones included.
    async fn get_user_urls(&self, user_id: &str) -> Result<Vec<UrlRecord>>;

    /// Inserts many `token -> url` pairs at once.
    async fn add_url_batch(&self, urls: &HashMap<Token, String>) -> Result<()>;

    /// Tombstones every token in `tokens` owned by `user_id`.
    ///
    /// Unknown or foreign tokens are skipped silently.
    async fn delete_urls(&self, user_id: &str, tokens: &[Token]) -> Result<()>;

    fn storage_type(&self) -> StorageType;

    /// Writes a full snapshot to durable storage, if the engine has any.
    async fn save_to_file(&self) -> Result<()> {
        Ok(())
    }

    /// Points the engine at `path` and replays it, if the engine supports it.
    async fn load_from_file(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
