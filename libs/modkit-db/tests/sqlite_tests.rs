#![cfg(feature = "sqlite")]

use modkit_db::{ConnectOpts, DbEngine, DbHandle};
use tempfile::TempDir;

fn file_dsn(path: &std::path::Path, query: &str) -> String {
    let p = path.to_string_lossy().replace('\\', "/");
    if query.is_empty() {
        format!("sqlite://{p}")
    } else {
        format!("sqlite://{p}?{query}")
    }
}

#[tokio::test]
async fn file_database_is_created_with_parent_dirs() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("nested").join("data").join("notes.db");

    let db = DbHandle::connect(&file_dsn(&db_path, ""), ConnectOpts::default())
        .await
        .unwrap();

    assert_eq!(db.engine(), DbEngine::Sqlite);
    assert!(db_path.exists(), "database file should exist at {db_path:?}");
    db.close().await;
}

#[tokio::test]
async fn dsn_pragmas_are_applied_and_stripped() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("pragmas.db");
    let dsn = file_dsn(&db_path, "journal_mode=TRUNCATE&synchronous=FULL&busy_timeout=1234");

    let db = DbHandle::connect(&dsn, ConnectOpts::default()).await.unwrap();
    assert!(!db.dsn().contains("journal_mode"));

    let pool = db.sqlx_sqlite().unwrap();
    let (journal,): (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(journal.to_uppercase(), "TRUNCATE");

    let (busy,): (i64,) = sqlx::query_as("PRAGMA busy_timeout")
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(busy, 1234);
}

#[tokio::test]
async fn foreign_keys_are_enforced() {
    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .unwrap();
    let pool = db.sqlx_sqlite().unwrap();

    let (fk,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(fk, 1);

    sqlx::query("CREATE TABLE parent (id INTEGER PRIMARY KEY)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id) ON DELETE CASCADE)",
    )
    .execute(pool)
    .await
    .unwrap();

    let orphan = sqlx::query("INSERT INTO child (parent_id) VALUES (42)")
        .execute(pool)
        .await;
    assert!(orphan.is_err(), "orphan insert must violate the foreign key");

    sqlx::query("INSERT INTO parent (id) VALUES (1)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO child (parent_id) VALUES (1)")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query("DELETE FROM parent WHERE id = 1")
        .execute(pool)
        .await
        .unwrap();

    let (left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM child")
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(left, 0);
}

#[tokio::test]
async fn memory_database_survives_across_acquires() {
    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .unwrap();
    let pool = db.sqlx_sqlite().unwrap();

    sqlx::query("CREATE TABLE t (v TEXT)")
        .execute(pool)
        .await
        .unwrap();
    for v in ["a", "b", "c"] {
        sqlx::query("INSERT INTO t (v) VALUES (?)")
            .bind(v)
            .execute(pool)
            .await
            .unwrap();
    }

    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM t")
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(n, 3);
}

#[tokio::test]
async fn sea_connection_shares_the_pool() {
    use sea_orm::{ConnectionTrait, Statement};

    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .unwrap();
    let sea = db.sea();

    sea.execute(Statement::from_string(
        sea.get_database_backend(),
        "CREATE TABLE s (id INTEGER PRIMARY KEY)",
    ))
    .await
    .unwrap();

    let pool = db.sqlx_sqlite().unwrap();
    let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM s")
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(n, 0);
}
