use async_trait::async_trait;
use jiff::Timestamp;
use snip_core::error::{Result, StorageError};
use snip_core::{Repository, StorageType, Token, UrlRecord};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Upper bound for a single point operation.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = include_str!("../ddl/postgres/urls.sql");

const ORIGINAL_URL_CONSTRAINT: &str = "idx_urls_original_url";
const TOKEN_CONSTRAINT: &str = "urls_token_key";

/// PostgreSQL implementation of the storage contract.
///
/// Deletion is a soft tombstone on `is_deleted`. `original_url` is unique
/// across all rows, tombstoned or not, so a deleted URL cannot be
/// shortened again on this engine.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
    op_timeout: Duration,
}

impl PostgresRepository {
    /// Wraps an existing pool. The schema is assumed to exist.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Opens a pool against `dsn` and creates the schema if it is missing.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(DEFAULT_OP_TIMEOUT)
            .connect(dsn)
            .await
            .map_err(map_sqlx_error)?;

        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        info!("connected to postgres");
        Ok(repo)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn set_pool(&mut self, pool: PgPool) {
        self.pool = pool;
    }

    pub async fn ping(&self) -> Result<()> {
        self.deadline("ping", sqlx::query("SELECT 1").execute(&self.pool))
            .await?
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Runs `fut` under the per-operation deadline.
    ///
    /// The outer error is the timeout; the inner one is left raw so callers
    /// can inspect constraint violations.
    async fn deadline<T, F>(
        &self,
        op: &'static str,
        fut: F,
    ) -> Result<std::result::Result<T, sqlx::Error>>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| StorageError::Timeout(format!("{op} exceeded {:?}", self.op_timeout)))
    }
}

fn parse_created_at(seconds: Option<i64>) -> Result<Option<Timestamp>> {
    seconds
        .map(|value| {
            Timestamp::from_second(value).map_err(|e| {
                StorageError::InvalidData(format!("invalid created_at timestamp '{}': {e}", value))
            })
        })
        .transpose()
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

/// Maps an insert failure, turning unique violations into contract errors.
fn map_insert_error(err: sqlx::Error, token: &Token, original_url: &str) -> StorageError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(ORIGINAL_URL_CONSTRAINT) => {
                    return StorageError::UrlExists(original_url.to_string())
                }
                Some(TOKEN_CONSTRAINT) => return StorageError::TokenTaken(token.to_string()),
                _ => {}
            }
        }
    }
    map_sqlx_error(err)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn add_url(&self, token: &Token, original_url: &str, user_id: &str) -> Result<()> {
        if token.is_empty() || original_url.is_empty() {
            return Err(StorageError::InvalidInput(
                "token and url cannot be empty".to_string(),
            ));
        }

        let insert = sqlx::query(
            r#"
            INSERT INTO urls (id, token, original_url, user_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token.as_str())
        .bind(original_url)
        .bind(user_id)
        .execute(&self.pool);

        match self.deadline("add_url", insert).await? {
            Ok(_) => Ok(()),
            Err(err) => Err(map_insert_error(err, token, original_url)),
        }
    }

    async fn get_url(&self, token: &Token) -> Result<String> {
        let query = sqlx::query(
            r#"
            SELECT original_url, is_deleted
            FROM urls
            WHERE token = $1
            "#,
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool);

        let row = self
            .deadline("get_url", query)
            .await?
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound(token.to_string()));
        };

        let is_deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;
        if is_deleted {
            return Err(StorageError::UrlDeleted(token.to_string()));
        }

        row.try_get("original_url").map_err(map_sqlx_error)
    }

    async fn get_token_by_url(&self, original_url: &str) -> Result<Token> {
        let query = sqlx::query(
            r#"
            SELECT token
            FROM urls
            WHERE original_url = $1
            "#,
        )
        .bind(original_url)
        .fetch_optional(&self.pool);

        let row = self
            .deadline("get_token_by_url", query)
            .await?
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound(original_url.to_string()));
        };

        let token: String = row.try_get("token").map_err(map_sqlx_error)?;
        Ok(Token::new_unchecked(token))
    }

    async fn get_user_urls(&self, user_id: &str) -> Result<Vec<UrlRecord>> {
        let query = sqlx::query(
            r#"
            SELECT id, token, original_url, user_id, is_deleted,
                   EXTRACT(EPOCH FROM created_at)::BIGINT AS created_at
            FROM urls
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool);

        let rows = self
            .deadline("get_user_urls", query)
            .await?
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let token: String = row.try_get("token").map_err(map_sqlx_error)?;
                let created_at_raw: Option<i64> =
                    row.try_get("created_at").map_err(map_sqlx_error)?;

                Ok(UrlRecord {
                    id: row.try_get("id").map_err(map_sqlx_error)?,
                    token: Token::new_unchecked(token),
                    original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
                    user_id: row.try_get("user_id").map_err(map_sqlx_error)?,
                    is_deleted: row.try_get("is_deleted").map_err(map_sqlx_error)?,
                    created_at: parse_created_at(created_at_raw)?,
                })
            })
            .collect()
    }

    /// All-or-nothing insert. URLs that already exist are skipped; a token
    /// collision aborts the whole batch.
    async fn add_url_batch(&self, urls: &HashMap<Token, String>) -> Result<()> {
        if urls.is_empty() {
            return Err(StorageError::InvalidInput("empty batch".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for (token, original_url) in urls {
            let result = sqlx::query(
                r#"
                INSERT INTO urls (id, token, original_url, user_id)
                VALUES ($1, $2, $3, '')
                ON CONFLICT (original_url) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(token.as_str())
            .bind(original_url.as_str())
            .execute(&mut *tx)
            .await;

            if let Err(err) = result {
                let err = map_insert_error(err, token, original_url);
                tx.rollback().await.map_err(map_sqlx_error)?;
                return Err(err);
            }
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(rows = urls.len(), "committed url batch");
        Ok(())
    }

    async fn delete_urls(&self, user_id: &str, tokens: &[Token]) -> Result<()> {
        if tokens.is_empty() {
            return Ok(());
        }

        // Dropping the transaction on timeout rolls it back.
        let work = async {
            let mut tx = self.pool.begin().await?;
            for token in tokens {
                sqlx::query(
                    r#"
                    UPDATE urls
                    SET is_deleted = TRUE
                    WHERE token = $1
                      AND user_id = $2
                    "#,
                )
                .bind(token.as_str())
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await
        };

        self.deadline("delete_urls", work)
            .await?
            .map_err(map_sqlx_error)
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Database
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_at_parses_epoch_seconds() {
        let parsed = parse_created_at(Some(1_700_000_000)).unwrap();
        assert_eq!(parsed.map(|ts| ts.as_second()), Some(1_700_000_000));
        assert_eq!(parse_created_at(None).unwrap(), None);
    }

    #[test]
    fn created_at_out_of_range_is_invalid_data() {
        let err = parse_created_at(Some(i64::MAX)).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[test]
    fn pool_errors_map_to_transient_variants() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
    }

    #[test]
    fn non_database_insert_errors_fall_through() {
        let err = map_insert_error(
            sqlx::Error::PoolClosed,
            &Token::new_unchecked("abc123"),
            "https://a.example",
        );
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
