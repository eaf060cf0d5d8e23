use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sql_await::prelude::*;
use sql_await::test_utils::{Call, MockDriver, MockError, MockScript, Op, rows_outcome};

type MockConn = AwaitableConnection<sql_await::test_utils::MockConnection>;

fn setup() -> (MockScript, MockConn) {
    let script = MockScript::new();
    let client = AwaitableClient::new(MockDriver::new(&script));
    let conn = client.create_connection(&());
    (script, conn)
}

fn syntax_error() -> MockError {
    MockError::new(
        "ER_PARSE_ERROR",
        "You have an error in your SQL syntax near 'SELECTJKLSDF'",
    )
}

#[tokio::test]
async fn new_connection_starts_idle() {
    let (script, conn) = setup();
    assert!(!conn.in_transaction());
    assert!(script.calls().is_empty());
}

#[tokio::test]
async fn begin_query_commit_leaves_idle_without_rollback() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    let id = conn.raw().id();

    conn.begin_transaction().await?;
    assert!(conn.in_transaction());

    conn.query("SELECT MAX(id) maxId FROM people").await?;
    assert!(conn.in_transaction());

    conn.commit().await?;
    assert!(!conn.in_transaction());
    assert_eq!(script.count(id, &Call::Rollback), 0);
    assert_eq!(
        script.calls_for(id),
        vec![
            Call::BeginTransaction,
            Call::Query {
                sql: "SELECT MAX(id) maxId FROM people".into()
            },
            Call::Commit,
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_begin_leaves_flag_unset() {
    let (script, mut conn) = setup();
    let err = MockError::new("ER_LOCK_WAIT_TIMEOUT", "lock wait timeout");
    script.fail_next(Op::BeginTransaction, err.clone());

    let outcome = conn.begin_transaction().await;
    assert_eq!(outcome.err().and_then(SqlAwaitError::into_client), Some(err));
    assert!(!conn.in_transaction());
}

#[tokio::test]
async fn malformed_query_in_transaction_rolls_back_once() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    let id = conn.raw().id();
    conn.begin_transaction().await?;

    script.fail_next(Op::Query, syntax_error());
    let outcome = conn.query("SELECTJKLSDF").await;

    assert_eq!(
        outcome.err().and_then(SqlAwaitError::into_client),
        Some(syntax_error())
    );
    assert!(!conn.in_transaction());
    assert_eq!(script.count(id, &Call::Rollback), 1);
    // rollback was issued after the failing query and before the caller saw the error
    assert_eq!(script.calls_for(id).last(), Some(&Call::Rollback));
    Ok(())
}

#[tokio::test]
async fn failed_parameterized_query_in_transaction_rolls_back() -> Result<(), SqlAwaitError<MockError>>
{
    let (script, mut conn) = setup();
    let id = conn.raw().id();
    conn.begin_transaction().await?;

    let dup = MockError::new("ER_DUP_ENTRY", "Duplicate entry '7' for key 'PRIMARY'");
    script.fail_next(Op::Query, dup.clone());
    let outcome = conn
        .query_with_params(
            "INSERT INTO people (id, lastName) VALUES (?, ?)",
            &[RowValues::Int(7), "Marley".into()],
        )
        .await;

    assert_eq!(outcome.err().and_then(SqlAwaitError::into_client), Some(dup));
    assert!(!conn.in_transaction());
    assert_eq!(script.count(id, &Call::Rollback), 1);
    Ok(())
}

#[tokio::test]
async fn failed_query_outside_transaction_does_not_roll_back() {
    let (script, mut conn) = setup();
    let id = conn.raw().id();

    script.fail_next(Op::Query, syntax_error());
    let outcome = conn.query("SELECTJKLSDF").await;

    assert_eq!(
        outcome.err().and_then(SqlAwaitError::into_client),
        Some(syntax_error())
    );
    assert_eq!(script.count(id, &Call::Rollback), 0);
    assert!(!conn.in_transaction());
}

#[tokio::test]
async fn rollback_failure_never_replaces_query_error() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    conn.begin_transaction().await?;

    script.fail_next(Op::Query, syntax_error());
    script.fail_next(Op::Rollback, MockError::new("PROTOCOL_CONNECTION_LOST", "gone"));
    let outcome = conn.query("SELECTJKLSDF").await;

    assert_eq!(
        outcome.err().and_then(SqlAwaitError::into_client),
        Some(syntax_error())
    );
    assert!(!conn.in_transaction());
    Ok(())
}

#[tokio::test]
async fn failed_commit_in_transaction_rolls_back_and_surfaces_commit_error()
-> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    let id = conn.raw().id();
    conn.begin_transaction().await?;

    let deadlock = MockError::new("ER_LOCK_DEADLOCK", "Deadlock found");
    script.fail_next(Op::Commit, deadlock.clone());
    script.fail_next(Op::Rollback, MockError::new("ER_UNKNOWN", "rollback failed too"));
    let outcome = conn.commit().await;

    assert_eq!(outcome.err().and_then(SqlAwaitError::into_client), Some(deadlock));
    assert!(!conn.in_transaction());
    assert_eq!(
        script.calls_for(id),
        vec![Call::BeginTransaction, Call::Commit, Call::Rollback]
    );
    Ok(())
}

#[tokio::test]
async fn failed_commit_outside_transaction_skips_rollback() {
    let (script, mut conn) = setup();
    let id = conn.raw().id();
    let err = MockError::new("ER_NO_TX", "no transaction");
    script.fail_next(Op::Commit, err.clone());

    let outcome = conn.commit().await;
    assert_eq!(outcome.err().and_then(SqlAwaitError::into_client), Some(err));
    assert_eq!(script.count(id, &Call::Rollback), 0);
    assert!(!conn.in_transaction());
}

#[tokio::test]
async fn omitted_and_empty_params_use_distinct_call_forms() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    let id = conn.raw().id();

    conn.query("SELECT 1").await?;
    conn.query_with_params("SELECT 1", &[]).await?;

    assert_eq!(
        script.calls_for(id),
        vec![
            Call::Query {
                sql: "SELECT 1".into()
            },
            Call::QueryWithParams {
                sql: "SELECT 1".into(),
                params: vec![]
            },
        ]
    );
    Ok(())
}

#[tokio::test]
async fn query_result_is_passed_through_unmodified() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    script.push_result(rows_outcome(
        &["firstName", "lastName"],
        vec![vec!["John".into(), "Doe".into()]],
    ));

    let outcome = conn
        .query_with_params("SELECT * FROM people WHERE lastName = ?", &["Doe".into()])
        .await?;
    let rows = outcome.rows().map(|rs| rs.results.clone()).unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("firstName"), Some(&RowValues::Text("John".into())));
    Ok(())
}

#[tokio::test]
async fn standalone_rollback_always_resolves_and_keeps_flag() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    conn.begin_transaction().await?;

    script.fail_next(Op::Rollback, MockError::new("ER_UNKNOWN", "rollback failed"));
    conn.rollback().await;
    assert!(conn.in_transaction());

    conn.rollback().await;
    conn.mark_transaction_closed();
    assert!(!conn.in_transaction());
    assert_eq!(script.count(conn.raw().id(), &Call::Rollback), 2);
    Ok(())
}

#[tokio::test]
async fn end_and_destroy_close_the_transaction_flag() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    conn.begin_transaction().await?;
    conn.end().await?;
    assert!(!conn.in_transaction());

    conn.begin_transaction().await?;
    let lost = MockError::new("PROTOCOL_CONNECTION_LOST", "connection lost");
    script.fail_next(Op::Destroy, lost.clone());
    let outcome = conn.destroy().await;
    assert_eq!(outcome.err().and_then(SqlAwaitError::into_client), Some(lost));
    assert!(!conn.in_transaction());
    // teardown never compensates
    assert_eq!(script.count(conn.raw().id(), &Call::Rollback), 0);
    Ok(())
}

#[tokio::test]
async fn connect_and_end_errors_are_verbatim() {
    let (script, mut conn) = setup();
    let refused = MockError::new("ECONNREFUSED", "connect ECONNREFUSED 127.0.0.1:3306");
    script.fail_next(Op::Connect, refused.clone());
    script.fail_next(Op::End, refused.clone());

    let connect = conn.connect().await;
    assert_eq!(connect.err().and_then(SqlAwaitError::into_client), Some(refused.clone()));
    let end = conn.end().await;
    assert_eq!(end.err().and_then(SqlAwaitError::into_client), Some(refused));
}

#[tokio::test]
async fn change_user_does_not_touch_transaction() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    let options = ChangeUserOptions::default().with_user("reporting");

    conn.begin_transaction().await?;
    conn.change_user(&options).await?;
    assert!(conn.in_transaction());

    script.fail_next(Op::ChangeUser, MockError::new("ER_ACCESS_DENIED", "denied"));
    assert!(conn.change_user(&options).await.is_err());
    assert!(conn.in_transaction());
    assert_eq!(script.count(conn.raw().id(), &Call::Rollback), 0);
    assert_eq!(script.count(conn.raw().id(), &Call::ChangeUser(options)), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn completions_from_other_threads_are_awaited() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    script.set_deferred(true);

    conn.begin_transaction().await?;
    script.fail_next(Op::Query, syntax_error());
    let outcome = conn.query("SELECTJKLSDF").await;

    assert!(outcome.is_err());
    assert!(!conn.in_transaction());
    assert_eq!(script.count(conn.raw().id(), &Call::Rollback), 1);
    Ok(())
}

#[tokio::test]
async fn dropped_completion_is_reported_and_compensated() -> Result<(), SqlAwaitError<MockError>> {
    let (script, mut conn) = setup();
    conn.begin_transaction().await?;

    script.drop_next(Op::Query);
    let outcome = conn.query("SELECT 1").await;

    assert!(matches!(outcome, Err(SqlAwaitError::CallbackDropped("query"))));
    assert!(!conn.in_transaction());
    assert_eq!(script.count(conn.raw().id(), &Call::Rollback), 1);
    Ok(())
}

#[tokio::test]
async fn error_events_reach_subscribers() {
    let (_script, conn) = setup();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    conn.on(
        EventKind::Error,
        Arc::new(move |event: &ClientEvent| {
            if let ClientEvent::Error { message } = event {
                assert_eq!(message, "PROTOCOL_CONNECTION_LOST");
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }),
    );

    conn.raw().emit(&ClientEvent::Error {
        message: "PROTOCOL_CONNECTION_LOST".into(),
    });
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn format_delegates_to_client() {
    let (_script, conn) = setup();
    assert_eq!(
        conn.format("SELECT * FROM ?? WHERE lastName = ?", &["people".into(), "Doe".into()]),
        "SELECT * FROM `people` WHERE lastName = 'Doe'"
    );
    assert_eq!(conn.escape(&RowValues::Null), "NULL");
    assert_eq!(conn.escape_id("people.age"), "`people`.`age`");
}
