use crate::memory::MemoryRepository;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use snip_core::error::{Result, StorageError};
use snip_core::{Repository, StorageType, Token, UrlRecord};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One line of the append-only log.
#[derive(Debug, Serialize, Deserialize)]
struct LogEntry {
    uuid: Uuid,
    short_url: String,
    original_url: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<Timestamp>,
}

impl From<&UrlRecord> for LogEntry {
    fn from(record: &UrlRecord) -> Self {
        Self {
            uuid: record.id,
            short_url: record.token.to_string(),
            original_url: record.original_url.clone(),
            user_id: record.user_id.clone(),
            is_deleted: record.is_deleted,
            created_at: record.created_at,
        }
    }
}

impl From<LogEntry> for UrlRecord {
    fn from(entry: LogEntry) -> Self {
        Self {
            id: entry.uuid,
            token: Token::new_unchecked(entry.short_url),
            original_url: entry.original_url,
            user_id: entry.user_id,
            is_deleted: entry.is_deleted,
            created_at: entry.created_at,
        }
    }
}

/// Memory engine backed by a JSON-lines log.
///
/// Every mutation holds `log` for the whole of "update maps, write file",
/// so the on-disk order matches the order mutations became visible.
#[derive(Debug)]
pub struct FileRepository {
    memory: MemoryRepository,
    log: Mutex<Option<PathBuf>>,
}

impl FileRepository {
    /// Opens (or creates) the log at `path` and replays it.
    ///
    /// An empty path disables persistence. Failing to read the log is not
    /// fatal: the engine starts with whatever was replayed.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let repo = Self {
            memory: MemoryRepository::new(),
            log: Mutex::new(None),
        };

        if path.as_os_str().is_empty() {
            return repo;
        }

        match repo.replay(&path).await {
            Ok(count) => info!(path = %path.display(), records = count, "replayed url log"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to replay url log"),
        }

        *repo.log.lock().await = Some(path);
        repo
    }

    pub async fn path(&self) -> Option<PathBuf> {
        self.log.lock().await.clone()
    }

    pub fn len(&self) -> usize {
        self.memory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    async fn replay(&self, path: &Path) -> Result<usize> {
        ensure_parent(path).await?;
        let file = log_options().create(true).read(true).append(true).open(path).await?;

        // Raw segments: a line that is not UTF-8 is just another malformed entry.
        let mut lines = BufReader::new(file).split(b'\n');
        let mut count = 0;
        let mut line_no = 0usize;

        while let Some(line) = lines.next_segment().await? {
            line_no += 1;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let entry = match serde_json::from_slice::<LogEntry>(&line) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(line = line_no, error = %err, "skipping malformed log entry");
                    continue;
                }
            };

            if entry.short_url.is_empty() || entry.original_url.is_empty() {
                warn!(line = line_no, "skipping log entry with empty token or url");
                continue;
            }

            self.memory.restore(entry.into());
            count += 1;
        }

        Ok(count)
    }
}

/// 0644 on unix.
fn log_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    #[cfg(unix)]
    options.mode(0o644);
    options
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

fn encode_lines<'a>(records: impl IntoIterator<Item = &'a UrlRecord>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, &LogEntry::from(record))
            .map_err(|e| StorageError::InvalidData(e.to_string()))?;
        buf.push(b'\n');
    }
    Ok(buf)
}

async fn append(path: &Path, records: &[UrlRecord]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let buf = encode_lines(records)?;
    ensure_parent(path).await?;
    let mut file = log_options().create(true).append(true).open(path).await?;
    file.write_all(&buf).await?;
    file.flush().await?;
    Ok(())
}

async fn write_snapshot(path: &Path, records: &[UrlRecord]) -> Result<()> {
    let buf = encode_lines(records)?;
    ensure_parent(path).await?;
    let mut file = log_options()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;
    file.write_all(&buf).await?;
    file.flush().await?;
    debug!(path = %path.display(), records = records.len(), "wrote url snapshot");
    Ok(())
}

#[async_trait]
impl Repository for FileRepository {
    async fn add_url(&self, token: &Token, original_url: &str, user_id: &str) -> Result<()> {
        let log = self.log.lock().await;

        let record = self
            .memory
            .insert(token, original_url, user_id, Some(Timestamp::now()))?;

        if let Some(path) = log.as_deref() {
            if let Err(err) = append(path, std::slice::from_ref(&record)).await {
                warn!(path = %path.display(), token = %token, error = %err, "failed to append url record");
            }
        }

        Ok(())
    }

    async fn get_url(&self, token: &Token) -> Result<String> {
        self.memory.get_url(token).await
    }

    async fn get_token_by_url(&self, original_url: &str) -> Result<Token> {
        self.memory.get_token_by_url(original_url).await
    }

    async fn get_user_urls(&self, user_id: &str) -> Result<Vec<UrlRecord>> {
        self.memory.get_user_urls(user_id).await
    }

    async fn add_url_batch(&self, urls: &HashMap<Token, String>) -> Result<()> {
        let log = self.log.lock().await;

        let records = self.memory.insert_batch(urls, Some(Timestamp::now()));

        if let Some(path) = log.as_deref() {
            if let Err(err) = append(path, &records).await {
                warn!(path = %path.display(), records = records.len(), error = %err, "failed to append url batch");
            }
        }

        Ok(())
    }

    async fn delete_urls(&self, user_id: &str, tokens: &[Token]) -> Result<()> {
        let log = self.log.lock().await;

        if self.memory.tombstone(user_id, tokens) == 0 {
            return Ok(());
        }

        // Tombstones rewrite the whole log so replay sees the final state.
        if let Some(path) = log.as_deref() {
            write_snapshot(path, &self.memory.snapshot()).await?;
        }

        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::File
    }

    async fn save_to_file(&self) -> Result<()> {
        let log = self.log.lock().await;
        match log.as_deref() {
            Some(path) => write_snapshot(path, &self.memory.snapshot()).await,
            None => Ok(()),
        }
    }

    async fn load_from_file(&self, path: &Path) -> Result<()> {
        let mut log = self.log.lock().await;
        *log = Some(path.to_path_buf());
        let count = self.replay(path).await?;
        info!(path = %path.display(), records = count, "loaded url log");
        Ok(())
    }
}
