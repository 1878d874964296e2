//! A scripted native handle for exercising [`Connection`] without a database.
//!
//! [`MockHandle`] records every call it receives and answers from a queue of
//! replies. Tests keep the paired [`MockProbe`] to script replies and inspect
//! calls after the handle has been moved into a connection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::connection::Connection;
use crate::driver::Driver;
use crate::error::DriverError;
use crate::native::{NativeExecution, NativeHandle, Platform};
use crate::params::{ConnectionParameters, ParamValue};
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::translator::{NativeFailure, NativeResult};
use crate::types::{DatabaseType, RowValues};

static PLATFORM: Platform = Platform {
    placeholders: PlaceholderStyle::Sqlite,
    identity_sql: "SELECT mock_identity()",
    sequence_sql: "SELECT mock_sequence_value(?)",
    server_version_sql: None,
    current_database_sql: None,
};

/// One call received by a [`MockHandle`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub method: &'static str,
    pub sql: Option<String>,
    pub params: Vec<RowValues>,
}

/// Scripted answer for the next `execute` or `query` call.
#[derive(Debug, Clone)]
pub enum MockReply {
    Execute(NativeExecution),
    Query(ResultSet),
    Fail(NativeFailure),
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<MockCall>,
    replies: VecDeque<MockReply>,
    failures: HashMap<&'static str, NativeFailure>,
    generated_id: Option<String>,
    server_version: Option<String>,
    transaction_open: bool,
    closed: bool,
}

/// Shared view of a [`MockHandle`]'s state.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

impl MockProbe {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the answer for the next `execute` or `query`.
    pub fn push_reply(&self, reply: MockReply) {
        self.lock().replies.push_back(reply);
    }

    /// Queue a single-column result set.
    pub fn push_rows(&self, column: &str, values: Vec<RowValues>) {
        let mut result_set = ResultSet::with_capacity(values.len());
        result_set.set_column_names(Arc::new(vec![column.to_string()]));
        for value in values {
            result_set.add_row_values(vec![value]);
        }
        self.push_reply(MockReply::Query(result_set));
    }

    /// Make the next call to `method` fail. Applies to every handle method
    /// by name, e.g. `"begin"` or `"configure_strict"`.
    pub fn fail_next(&self, method: &'static str, failure: NativeFailure) {
        self.lock().failures.insert(method, failure);
    }

    /// Identity the handle reports after inserts.
    pub fn set_generated_id(&self, id: Option<&str>) {
        self.lock().generated_id = id.map(str::to_string);
    }

    pub fn set_server_version(&self, version: Option<&str>) {
        self.lock().server_version = version.map(str::to_string);
    }

    /// End the open transaction as a backend does when it rolls back on its
    /// own.
    pub fn end_transaction(&self) {
        self.lock().transaction_open = false;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// How many times `method` was called.
    #[must_use]
    pub fn count(&self, method: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// A native handle that talks to nothing.
#[derive(Debug, Default)]
pub struct MockHandle {
    probe: MockProbe,
}

impl MockHandle {
    /// A handle and the probe that observes it.
    #[must_use]
    pub fn new() -> (Self, MockProbe) {
        let handle = Self::default();
        handle.probe.set_server_version(Some("mock 1.0"));
        let probe = handle.probe.clone();
        (handle, probe)
    }

    fn record(
        &self,
        method: &'static str,
        sql: Option<&str>,
        params: &[RowValues],
    ) -> NativeResult<MutexGuard<'_, MockState>> {
        let mut state = self.probe.lock();
        state.calls.push(MockCall {
            method,
            sql: sql.map(str::to_string),
            params: params.to_vec(),
        });
        if state.closed && method != "close" {
            return Err(NativeFailure::message("mock handle is closed"));
        }
        match state.failures.remove(method) {
            Some(failure) => Err(failure),
            None => Ok(state),
        }
    }
}

impl NativeHandle for MockHandle {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mock
    }

    fn platform(&self) -> &'static Platform {
        &PLATFORM
    }

    fn configure_strict(&mut self) -> NativeResult<()> {
        self.record("configure_strict", None, &[])?;
        Ok(())
    }

    fn apply_session_option(&mut self, name: &str, value: &ParamValue) -> NativeResult<()> {
        let sql = format!("{name} = {value}");
        self.record("apply_session_option", Some(&sql), &[])?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[RowValues]) -> NativeResult<NativeExecution> {
        let mut state = self.record("execute", Some(sql), params)?;
        match state.replies.pop_front() {
            None => Ok(NativeExecution::affected(0)),
            Some(MockReply::Execute(outcome)) => Ok(outcome),
            Some(MockReply::Query(rows)) => Ok(NativeExecution {
                rows_affected: u64::try_from(rows.rows_affected).ok(),
            }),
            Some(MockReply::Fail(failure)) => Err(failure),
        }
    }

    fn query(&mut self, sql: &str, params: &[RowValues]) -> NativeResult<ResultSet> {
        let mut state = self.record("query", Some(sql), params)?;
        match state.replies.pop_front() {
            None => Ok(ResultSet::default()),
            Some(MockReply::Query(rows)) => Ok(rows),
            Some(MockReply::Execute(outcome)) => Ok(ResultSet::affected(
                outcome
                    .rows_affected
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or_default(),
            )),
            Some(MockReply::Fail(failure)) => Err(failure),
        }
    }

    fn last_generated_id(&mut self) -> NativeResult<Option<String>> {
        let state = self.record("last_generated_id", None, &[])?;
        Ok(state.generated_id.clone())
    }

    fn begin(&mut self) -> NativeResult<()> {
        self.record("begin", None, &[])?.transaction_open = true;
        Ok(())
    }

    fn commit(&mut self) -> NativeResult<()> {
        self.record("commit", None, &[])?.transaction_open = false;
        Ok(())
    }

    fn rollback(&mut self) -> NativeResult<()> {
        self.record("rollback", None, &[])?.transaction_open = false;
        Ok(())
    }

    fn in_transaction(&mut self) -> NativeResult<bool> {
        let state = self.record("in_transaction", None, &[])?;
        Ok(state.transaction_open)
    }

    fn server_version(&mut self) -> NativeResult<Option<String>> {
        let state = self.record("server_version", None, &[])?;
        Ok(state.server_version.clone())
    }

    fn close(&mut self) -> NativeResult<()> {
        let mut state = self.record("close", None, &[])?;
        state.closed = true;
        Ok(())
    }
}

/// Driver handing out [`MockHandle`] connections. The probe of the most
/// recent connection is kept for inspection.
#[derive(Debug, Default)]
pub struct MockDriver {
    last_probe: Mutex<Option<MockProbe>>,
}

impl MockDriver {
    #[must_use]
    pub fn last_probe(&self) -> Option<MockProbe> {
        self.last_probe
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Driver for MockDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mock
    }

    fn connect(
        &self,
        params: &ConnectionParameters,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Connection, DriverError> {
        let (handle, probe) = MockHandle::new();
        *self.last_probe.lock().unwrap_or_else(PoisonError::into_inner) = Some(probe);
        let params = crate::driver::with_credentials(params, user, password);
        Connection::open(Box::new(handle), params)
    }

    fn get_database(&self, conn: &Connection) -> Result<Option<String>, DriverError> {
        Ok(conn.parameters().dbname().map(str::to_string))
    }
}

/// Open a connection on a fresh [`MockHandle`].
///
/// # Panics
/// Panics if `params` holds an invalid session option name.
#[must_use]
pub fn mock_connection(params: ConnectionParameters) -> (Connection, MockProbe) {
    let (handle, probe) = MockHandle::new();
    let conn = Connection::open(Box::new(handle), params).expect("mock connection opens");
    (conn, probe)
}
