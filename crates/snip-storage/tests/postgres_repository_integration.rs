use std::collections::HashMap;
use std::time::Duration;

use snip_storage::{PostgresRepository, Repository, StorageError, StorageType, Token};
use snip_test_infra::postgres::{PostgresConfig, PostgresServer};
use sqlx::postgres::PgPoolOptions;

struct Fixture {
    _postgres: PostgresServer,
    repo: PostgresRepository,
}

impl Fixture {
    async fn start() -> Self {
        let postgres = PostgresServer::new(PostgresConfig::builder().build())
            .await
            .expect("start postgres");
        let url = postgres.database_url().await.expect("postgres url");
        let pool = connect_with_retry(&url).await;

        let repo = PostgresRepository::new(pool);
        repo.ensure_schema().await.expect("create schema");

        Self {
            _postgres: postgres,
            repo,
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::PgPool {
    let mut last_error = None;

    for _ in 0..20 {
        match PgPoolOptions::new().max_connections(5).connect(url).await {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect postgres: {last_error:?}");
}

fn token(value: &str) -> Token {
    Token::new_unchecked(value)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn add_and_get() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&token("abc123"), "https://example.com", "u1")
        .await
        .unwrap();

    let url = fixture.repo.get_url(&token("abc123")).await.unwrap();
    assert_eq!(url, "https://example.com");
    assert_eq!(fixture.repo.storage_type(), StorageType::Database);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn unknown_token_is_not_found() {
    let fixture = Fixture::start().await;

    let err = fixture.repo.get_url(&token("nope")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));

    let err = fixture
        .repo
        .get_token_by_url("https://nope.example")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_url_maps_to_url_exists() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&token("abc123"), "https://dup.example", "u1")
        .await
        .unwrap();

    let err = fixture
        .repo
        .add_url(&token("def456"), "https://dup.example", "u2")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UrlExists(_)));

    let existing = fixture
        .repo
        .get_token_by_url("https://dup.example")
        .await
        .unwrap();
    assert_eq!(existing, token("abc123"));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_token_maps_to_token_taken() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&token("abc123"), "https://one.example", "u1")
        .await
        .unwrap();

    let err = fixture
        .repo
        .add_url(&token("abc123"), "https://two.example", "u1")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::TokenTaken(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn delete_is_scoped_to_owner_and_keeps_reverse_lookup() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&token("mine01"), "https://mine.example", "u1")
        .await
        .unwrap();
    fixture
        .repo
        .add_url(&token("their1"), "https://theirs.example", "u2")
        .await
        .unwrap();

    fixture
        .repo
        .delete_urls("u1", &[token("mine01"), token("their1")])
        .await
        .unwrap();

    let err = fixture.repo.get_url(&token("mine01")).await.unwrap_err();
    assert!(matches!(err, StorageError::UrlDeleted(_)));
    assert_eq!(
        fixture.repo.get_url(&token("their1")).await.unwrap(),
        "https://theirs.example"
    );
    assert_eq!(
        fixture
            .repo
            .get_token_by_url("https://mine.example")
            .await
            .unwrap(),
        token("mine01")
    );
}

#[tokio::test]
#[ignore = "requires docker"]
async fn deleted_url_still_blocks_reuse() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&token("abc123"), "https://gone.example", "u1")
        .await
        .unwrap();
    fixture
        .repo
        .delete_urls("u1", &[token("abc123")])
        .await
        .unwrap();

    let err = fixture
        .repo
        .add_url(&token("def456"), "https://gone.example", "u1")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::UrlExists(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn user_urls_carry_tombstones_and_timestamps() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&token("t1"), "https://b.example", "u1")
        .await
        .unwrap();
    fixture
        .repo
        .add_url(&token("t2"), "https://c.example", "u1")
        .await
        .unwrap();
    fixture
        .repo
        .add_url(&token("t3"), "https://x.example", "u2")
        .await
        .unwrap();
    fixture
        .repo
        .delete_urls("u1", &[token("t2")])
        .await
        .unwrap();

    let records = fixture.repo.get_user_urls("u1").await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.user_id == "u1"));
    assert!(records.iter().all(|r| r.created_at.is_some()));
    assert!(records
        .iter()
        .any(|r| r.token == token("t2") && r.is_deleted));

    assert!(fixture.repo.get_user_urls("nobody").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn batch_skips_existing_urls() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&token("t1"), "https://a.example", "u1")
        .await
        .unwrap();

    let batch = HashMap::from([
        (token("t2"), "https://b.example".to_string()),
        (token("t3"), "https://a.example".to_string()),
    ]);
    fixture.repo.add_url_batch(&batch).await.unwrap();

    assert_eq!(
        fixture.repo.get_url(&token("t2")).await.unwrap(),
        "https://b.example"
    );
    let err = fixture.repo.get_url(&token("t3")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn batch_token_collision_rolls_back() {
    let fixture = Fixture::start().await;

    fixture
        .repo
        .add_url(&token("taken1"), "https://a.example", "u1")
        .await
        .unwrap();

    let batch = HashMap::from([
        (token("fresh1"), "https://fresh.example".to_string()),
        (token("taken1"), "https://other.example".to_string()),
    ]);
    let err = fixture.repo.add_url_batch(&batch).await.unwrap_err();
    assert!(matches!(err, StorageError::TokenTaken(_)));

    let err = fixture.repo.get_url(&token("fresh1")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn empty_batch_is_invalid() {
    let fixture = Fixture::start().await;

    let err = fixture
        .repo
        .add_url_batch(&HashMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidInput(_)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn ping_and_schema_are_idempotent() {
    let fixture = Fixture::start().await;

    fixture.repo.ping().await.unwrap();
    fixture.repo.ensure_schema().await.unwrap();
}

#[tokio::test]
#[ignore = "requires docker"]
async fn second_batch_ignores_known_urls() {
    let fixture = Fixture::start().await;

    let first = HashMap::from([
        (token("tA"), "https://g.example".to_string()),
        (token("tB"), "https://h.example".to_string()),
    ]);
    fixture.repo.add_url_batch(&first).await.unwrap();

    let second = HashMap::from([
        (token("tC"), "https://g.example".to_string()),
        (token("tD"), "https://i.example".to_string()),
    ]);
    fixture.repo.add_url_batch(&second).await.unwrap();

    let err = fixture.repo.get_url(&token("tC")).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
    assert_eq!(
        fixture.repo.get_url(&token("tD")).await.unwrap(),
        "https://i.example"
    );
    assert_eq!(
        fixture
            .repo
            .get_token_by_url("https://g.example")
            .await
            .unwrap(),
        token("tA")
    );
}
