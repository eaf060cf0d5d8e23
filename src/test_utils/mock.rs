//! Scripted raw client that records every call.
//!
//! Operations succeed unless a failure was queued for them with [`MockScript::fail_next`].
//! Completions fire inline by default, or from a spawned thread with
//! [`MockScript::set_deferred`].

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::events::{ClientEvent, EventEmitter, EventHandler, EventKind};
use crate::raw::{Completion, PooledRawConnection, RawConnection, RawDriver, RawPool};
use crate::results::QueryOutcome;
use crate::types::{ChangeUserOptions, RowValues};

/// Connection id used for calls made on the pool itself.
pub const POOL_ID: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct MockError {
    pub code: String,
    pub message: String,
}

impl MockError {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Scriptable operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Connect,
    End,
    Destroy,
    Query,
    BeginTransaction,
    Commit,
    Rollback,
    ChangeUser,
    GetConnection,
    PoolQuery,
    PoolEnd,
}

/// A raw call as the client saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    End,
    Destroy,
    Query { sql: String },
    QueryWithParams { sql: String, params: Vec<RowValues> },
    BeginTransaction,
    Commit,
    Rollback,
    ChangeUser(ChangeUserOptions),
    Release,
    GetConnection,
    PoolQuery { sql: String, params: Option<Vec<RowValues>> },
    PoolEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub connection: u64,
    pub call: Call,
}

#[derive(Default)]
struct ScriptState {
    failures: HashMap<Op, VecDeque<MockError>>,
    dropped: HashSet<Op>,
    results: VecDeque<QueryOutcome>,
    calls: Vec<RecordedCall>,
    deferred: bool,
    next_id: u64,
}

/// Shared script and call log for every mock object created from it.
#[derive(Clone, Default)]
pub struct MockScript {
    inner: Arc<Mutex<ScriptState>>,
}

impl MockScript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fail the next call of `op` with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: Op, err: MockError) {
        self.state().failures.entry(op).or_default().push_back(err);
    }

    /// Drop the completion of the next call of `op` without invoking it.
    pub fn drop_next(&self, op: Op) {
        self.state().dropped.insert(op);
    }

    /// Result for the next successful query; defaults to an empty modification.
    pub fn push_result(&self, outcome: QueryOutcome) {
        self.state().results.push_back(outcome);
    }

    /// Fire completions from a spawned thread instead of inline.
    pub fn set_deferred(&self, deferred: bool) {
        self.state().deferred = deferred;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Calls made on one connection, in order.
    #[must_use]
    pub fn calls_for(&self, connection: u64) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.connection == connection)
            .map(|c| c.call.clone())
            .collect()
    }

    #[must_use]
    pub fn count(&self, connection: u64, call: &Call) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.connection == connection && &c.call == call)
            .count()
    }

    fn allocate_id(&self) -> u64 {
        let mut state = self.state();
        state.next_id += 1;
        state.next_id
    }

    fn record(&self, connection: u64, call: Call) {
        self.state().calls.push(RecordedCall { connection, call });
    }

    fn complete<T, F>(&self, op: Op, ok: F, done: Completion<T, MockError>)
    where
        T: Send + 'static,
        F: FnOnce(&mut ScriptState) -> T,
    {
        let (outcome, deferred) = {
            let mut state = self.state();
            if state.dropped.remove(&op) {
                drop(done);
                return;
            }
            let failure = state.failures.get_mut(&op).and_then(VecDeque::pop_front);
            let outcome = match failure {
                Some(err) => Err(err),
                None => Ok(ok(&mut *state)),
            };
            (outcome, state.deferred)
        };
        if deferred {
            std::thread::spawn(move || done(outcome));
        } else {
            done(outcome);
        }
    }

    fn complete_unit(&self, op: Op, done: Completion<(), MockError>) {
        self.complete(op, |_| (), done);
    }

    fn complete_query(&self, op: Op, done: Completion<QueryOutcome, MockError>) {
        self.complete(
            op,
            |state| state.results.pop_front().unwrap_or_default(),
            done,
        );
    }
}

impl std::fmt::Debug for MockScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockScript")
            .field("calls", &self.state().calls.len())
            .finish_non_exhaustive()
    }
}

/// Recording connection; standalone or leased from a [`MockPool`].
#[derive(Debug)]
pub struct MockConnection {
    id: u64,
    script: MockScript,
    events: EventEmitter,
    pool_events: Option<EventEmitter>,
}

impl MockConnection {
    #[must_use]
    pub fn new(script: &MockScript) -> Self {
        Self {
            id: script.allocate_id(),
            script: script.clone(),
            events: EventEmitter::new(),
            pool_events: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Deliver `event` to this connection's subscribers.
    pub fn emit(&self, event: &ClientEvent) -> usize {
        self.events.emit(event)
    }
}

impl RawConnection for MockConnection {
    type Error = MockError;
    type Output = QueryOutcome;

    fn connect(&self, done: Completion<(), MockError>) {
        self.script.record(self.id, Call::Connect);
        self.script.complete_unit(Op::Connect, done);
    }

    fn end(&self, done: Completion<(), MockError>) {
        self.script.record(self.id, Call::End);
        self.script.complete_unit(Op::End, done);
    }

    fn destroy(&self, done: Completion<(), MockError>) {
        self.script.record(self.id, Call::Destroy);
        self.script.complete_unit(Op::Destroy, done);
    }

    fn query(&self, sql: &str, done: Completion<QueryOutcome, MockError>) {
        self.script.record(self.id, Call::Query { sql: sql.into() });
        self.script.complete_query(Op::Query, done);
    }

    fn query_with_params(
        &self,
        sql: &str,
        params: &[RowValues],
        done: Completion<QueryOutcome, MockError>,
    ) {
        self.script.record(
            self.id,
            Call::QueryWithParams {
                sql: sql.into(),
                params: params.to_vec(),
            },
        );
        self.script.complete_query(Op::Query, done);
    }

    fn begin_transaction(&self, done: Completion<(), MockError>) {
        self.script.record(self.id, Call::BeginTransaction);
        self.script.complete_unit(Op::BeginTransaction, done);
    }

    fn commit(&self, done: Completion<(), MockError>) {
        self.script.record(self.id, Call::Commit);
        self.script.complete_unit(Op::Commit, done);
    }

    fn rollback(&self, done: Completion<(), MockError>) {
        self.script.record(self.id, Call::Rollback);
        self.script.complete_unit(Op::Rollback, done);
    }

    fn change_user(&self, options: &ChangeUserOptions, done: Completion<(), MockError>) {
        self.script
            .record(self.id, Call::ChangeUser(options.clone()));
        self.script.complete_unit(Op::ChangeUser, done);
    }

    fn on(&self, event: EventKind, handler: EventHandler) {
        self.events.on(event, handler);
    }
}

impl PooledRawConnection for MockConnection {
    fn release(self) {
        self.script.record(self.id, Call::Release);
        if let Some(events) = &self.pool_events {
            events.emit(&ClientEvent::Release { thread_id: self.id });
        }
    }
}

/// Recording pool; every lease is a fresh [`MockConnection`] sharing the script.
#[derive(Debug, Clone)]
pub struct MockPool {
    script: MockScript,
    events: EventEmitter,
}

impl MockPool {
    #[must_use]
    pub fn new(script: &MockScript) -> Self {
        Self {
            script: script.clone(),
            events: EventEmitter::new(),
        }
    }

    /// Deliver `event` to this pool's subscribers.
    pub fn emit(&self, event: &ClientEvent) -> usize {
        self.events.emit(event)
    }
}

impl RawPool for MockPool {
    type Connection = MockConnection;

    fn get_connection(&self, done: Completion<MockConnection, MockError>) {
        self.script.record(POOL_ID, Call::GetConnection);
        let script = self.script.clone();
        let pool_events = self.events.clone();
        let events = self.events.clone();
        let done: Completion<MockConnection, MockError> = Box::new(move |outcome| {
            if let Ok(conn) = &outcome {
                events.emit(&ClientEvent::Acquire { thread_id: conn.id });
            }
            done(outcome);
        });
        self.script.complete(
            Op::GetConnection,
            move |state| {
                state.next_id += 1;
                MockConnection {
                    id: state.next_id,
                    script,
                    events: EventEmitter::new(),
                    pool_events: Some(pool_events),
                }
            },
            done,
        );
    }

    fn query(&self, sql: &str, done: Completion<QueryOutcome, MockError>) {
        self.script.record(
            POOL_ID,
            Call::PoolQuery {
                sql: sql.into(),
                params: None,
            },
        );
        self.script.complete_query(Op::PoolQuery, done);
    }

    fn query_with_params(
        &self,
        sql: &str,
        params: &[RowValues],
        done: Completion<QueryOutcome, MockError>,
    ) {
        self.script.record(
            POOL_ID,
            Call::PoolQuery {
                sql: sql.into(),
                params: Some(params.to_vec()),
            },
        );
        self.script.complete_query(Op::PoolQuery, done);
    }

    fn end(&self, done: Completion<(), MockError>) {
        self.script.record(POOL_ID, Call::PoolEnd);
        self.script.complete_unit(Op::PoolEnd, done);
    }

    fn on(&self, event: EventKind, handler: EventHandler) {
        self.events.on(event, handler);
    }
}

/// [`RawDriver`] producing mock objects bound to one script.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    script: MockScript,
}

impl MockDriver {
    #[must_use]
    pub fn new(script: &MockScript) -> Self {
        Self {
            script: script.clone(),
        }
    }

    #[must_use]
    pub fn script(&self) -> &MockScript {
        &self.script
    }
}

impl RawDriver for MockDriver {
    type Config = ();
    type Connection = MockConnection;
    type Pool = MockPool;

    fn create_connection(&self, _config: &()) -> MockConnection {
        MockConnection::new(&self.script)
    }

    fn create_pool(&self, _config: &()) -> MockPool {
        MockPool::new(&self.script)
    }
}
