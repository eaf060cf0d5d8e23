#![cfg(feature = "sqlite")]
use std::error::Error;
use std::sync::{Arc, Mutex};

use sql_await::prelude::*;
use sql_await::sqlite::{self, SqliteConfig};

fn pool_config(dir: &tempfile::TempDir, max_size: usize) -> SqliteConfig {
    SqliteConfig::builder(dir.path().join("pool.db").to_string_lossy().into_owned())
        .pool_max_size(max_size)
        .finish()
}

fn event_log(
    pool: &AwaitablePool<SqliteRawPool>,
    kinds: &[EventKind],
) -> Arc<Mutex<Vec<EventKind>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    for kind in kinds {
        let sink = Arc::clone(&log);
        pool.on(
            *kind,
            Arc::new(move |event: &ClientEvent| {
                if let Ok(mut log) = sink.lock() {
                    log.push(event.kind());
                }
            }),
        );
    }
    log
}

#[tokio::test]
async fn sqlite_pool_query_and_lease() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let pool = sqlite::create_pool(&pool_config(&dir, 2));

    pool.query("CREATE TABLE people (id INTEGER PRIMARY KEY, lastName TEXT)")
        .await?;
    pool.query_with_params("INSERT INTO people (lastName) VALUES (?)", &["Doe".into()])
        .await?;

    let mut conn = pool.get_connection().await?;
    assert!(!conn.in_transaction());
    let outcome = conn.query("SELECT lastName FROM people").await?;
    let rows = outcome.rows().map(ResultSet::len).unwrap_or_default();
    assert_eq!(rows, 1);
    conn.release();

    pool.end().await?;
    Ok(())
}

#[tokio::test]
async fn sqlite_pool_lease_rolls_back_on_failure() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let pool = sqlite::create_pool(&pool_config(&dir, 2));
    pool.query("CREATE TABLE people (id INTEGER PRIMARY KEY, lastName TEXT)")
        .await?;

    let mut conn = pool.get_connection().await?;
    conn.begin_transaction().await?;
    conn.query("INSERT INTO people (lastName) VALUES ('Marley')")
        .await?;
    assert!(conn.query("SELECTJKLSDF").await.is_err());
    assert!(!conn.in_transaction());
    conn.release();

    let count = pool.query("SELECT COUNT(*) AS n FROM people").await?;
    let n = count
        .rows()
        .and_then(|rs| rs.results.first())
        .and_then(|row| row.get("n"))
        .cloned();
    assert_eq!(n, Some(RowValues::Int(0)));
    pool.end().await?;
    Ok(())
}

#[tokio::test]
async fn sqlite_pool_commit_is_visible_to_other_leases() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let pool = sqlite::create_pool(&pool_config(&dir, 2));
    pool.query("CREATE TABLE people (id INTEGER PRIMARY KEY, lastName TEXT)")
        .await?;

    let mut writer = pool.get_connection().await?;
    writer.begin_transaction().await?;
    writer
        .query_with_params("INSERT INTO people (lastName) VALUES (?)", &["Scrooge".into()])
        .await?;
    writer.commit().await?;
    writer.release();

    let mut reader = pool.get_connection().await?;
    let outcome = reader
        .query_with_params("SELECT id FROM people WHERE lastName = ?", &["Scrooge".into()])
        .await?;
    assert_eq!(outcome.rows().map(ResultSet::len), Some(1));
    reader.release();
    pool.end().await?;
    Ok(())
}

#[tokio::test]
async fn sqlite_released_open_transaction_is_reset() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let pool = sqlite::create_pool(&pool_config(&dir, 1));
    pool.query("CREATE TABLE people (id INTEGER PRIMARY KEY, lastName TEXT)")
        .await?;

    let mut conn = pool.get_connection().await?;
    conn.begin_transaction().await?;
    conn.query("INSERT INTO people (lastName) VALUES ('Abandoned')")
        .await?;
    conn.release();

    // the single slot is recycled, which rolls the abandoned insert back
    let mut again = pool.get_connection().await?;
    let outcome = again.query("SELECT COUNT(*) AS n FROM people").await?;
    let n = outcome
        .rows()
        .and_then(|rs| rs.results.first())
        .and_then(|row| row.get("n"))
        .cloned();
    assert_eq!(n, Some(RowValues::Int(0)));
    again.begin_transaction().await?;
    again.commit().await?;
    again.release();
    pool.end().await?;
    Ok(())
}

#[tokio::test]
async fn sqlite_pool_emits_lifecycle_events() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let pool = sqlite::create_pool(&pool_config(&dir, 1));
    let log = event_log(
        &pool,
        &[EventKind::Connection, EventKind::Acquire, EventKind::Release],
    );

    let conn = pool.get_connection().await?;
    conn.release();
    let conn = pool.get_connection().await?;
    conn.release();

    let seen = log.lock().map(|l| l.clone()).unwrap_or_default();
    assert_eq!(
        seen,
        vec![
            EventKind::Connection,
            EventKind::Acquire,
            EventKind::Release,
            EventKind::Acquire,
            EventKind::Release,
        ]
    );
    pool.end().await?;
    Ok(())
}

#[tokio::test]
async fn sqlite_pool_enqueue_when_exhausted() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let pool = sqlite::create_pool(&pool_config(&dir, 1));
    let log = event_log(&pool, &[EventKind::Enqueue]);

    let held = pool.get_connection().await?;
    let waiter = pool.get_connection();
    tokio::pin!(waiter);
    assert!(
        tokio::time::timeout(std::time::Duration::from_millis(50), &mut waiter)
            .await
            .is_err()
    );
    held.release();
    let next = waiter.await?;
    next.release();

    let enqueued = log.lock().map(|l| l.len()).unwrap_or_default();
    assert_eq!(enqueued, 1);
    pool.end().await?;
    Ok(())
}

#[tokio::test]
async fn sqlite_pool_with_zero_connection_limit_still_serves() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let json = serde_json::json!({
        "database": dir.path().join("zero.db").to_string_lossy(),
        "connectionLimit": 0,
    });
    let config: SqliteConfig = serde_json::from_value(json)?;
    let pool = sqlite::create_pool(&config);

    let outcome =
        tokio::time::timeout(std::time::Duration::from_secs(2), pool.query("SELECT 1 AS one"))
            .await??;
    assert_eq!(outcome.rows().map(ResultSet::len), Some(1));

    let conn = tokio::time::timeout(std::time::Duration::from_secs(2), pool.get_connection())
        .await??;
    conn.release();
    pool.end().await?;
    Ok(())
}

#[tokio::test]
async fn sqlite_pool_end_closes_pool()-> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let pool = sqlite::create_pool(&pool_config(&dir, 2));
    pool.end().await?;

    assert!(matches!(
        pool.get_connection().await.err().and_then(SqlAwaitError::into_client),
        Some(SqliteClientError::PoolClosed)
    ));
    assert!(matches!(
        pool.end().await.err().and_then(SqlAwaitError::into_client),
        Some(SqliteClientError::PoolClosed)
    ));
    Ok(())
}

#[test]
fn sqlite_pool_without_runtime_reports_it() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir: {err}"),
    };
    let pool = sqlite::create_pool(&pool_config(&dir, 1));

    let outcome = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&outcome);
    pool.raw().get_connection(Box::new(
        move |result: Result<SqlitePooledConnection, SqliteClientError>| {
            if let Ok(mut slot) = slot.lock() {
                *slot = Some(matches!(result, Err(SqliteClientError::NoRuntime)));
            }
        },
    ));
    assert_eq!(outcome.lock().ok().and_then(|s| *s), Some(true));
}
