//! Dedup store durability against a real SQLite file.

use std::time::Duration;

use relay_core::common::DedupKey;
use relay_core::domains::dedup::SqliteDedupStore;
use relay_core::kernel::BaseDedupStore;
use tempfile::TempDir;

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("relay.sqlite").display())
}

#[tokio::test]
async fn test_seen_codes_survive_restart() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);
    let key = DedupKey::new("482913", "+1555");

    let store = SqliteDedupStore::connect(&url, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(!store.exists(&key).await.unwrap());
    store.commit(&key).await.unwrap();
    store.close().await;

    let reopened = SqliteDedupStore::connect(&url, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(reopened.exists(&key).await.unwrap());
    assert!(!reopened
        .exists(&DedupKey::new("482913", "+1666"))
        .await
        .unwrap());
    assert_eq!(reopened.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_reopening_does_not_rerun_migrations_destructively() {
    let dir = TempDir::new().unwrap();
    let url = database_url(&dir);

    for code in ["1111", "2222"] {
        let store = SqliteDedupStore::connect(&url, Duration::from_secs(5))
            .await
            .unwrap();
        store.commit(&DedupKey::new(code, "+1555")).await.unwrap();
        store.close().await;
    }

    let store = SqliteDedupStore::connect(&url, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_concurrent_commits_of_same_key_keep_one_entry() {
    let dir = TempDir::new().unwrap();
    let store = SqliteDedupStore::connect(&database_url(&dir), Duration::from_secs(5))
        .await
        .unwrap();
    let key = DedupKey::new("482913", "+1555");

    let (a, b) = tokio::join!(store.commit(&key), store.commit(&key));
    a.unwrap();
    b.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}
