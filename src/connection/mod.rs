//! The public connection contract.
//!
//! A [`Connection`] owns one native handle and composes the error translator,
//! the transaction coordinator and the last-insert-id tracker around it. All
//! calls block until the backend answers.

mod identity;

use std::cell::RefCell;
use std::fmt;

use tracing::{debug, warn};

pub use identity::LastInsertId;

use crate::error::DriverError;
use crate::native::{NativeHandle, Platform};
use crate::params::ConnectionParameters;
use crate::statement::{Statement, StatementKind};
use crate::transaction::{TransactionCoordinator, TransactionState};
use crate::translator::{NativeResult, NormalizedError, Operation, translate_last_error};
use crate::types::{DatabaseType, RowValues};

/// Quote `input` as a SQL string literal by doubling embedded single quotes.
///
/// This is a pure string transform. It does not consult the backend and does
/// not neutralise anything other than the quote character.
/// ```rust
/// assert_eq!(sql_driver::quote("O'Brien"), "'O''Brien'");
/// assert_eq!(sql_driver::quote(""), "''");
/// ```
#[must_use]
pub fn quote(input: &str) -> String {
    let mut quoted = String::with_capacity(input.len() + 2);
    quoted.push('\'');
    quoted.push_str(&input.replace('\'', "''"));
    quoted.push('\'');
    quoted
}

/// An open database connection.
///
/// `Connection` is `Send` but not `Sync`: the native handle may move to
/// another thread but is only ever used by one owner at a time. Wrap it in a
/// `Mutex` to share it, or open one connection per worker.
///
/// Dropping a connection rolls back any transaction still active and releases
/// the native handle.
pub struct Connection {
    handle: RefCell<Box<dyn NativeHandle>>,
    database_type: DatabaseType,
    platform: &'static Platform,
    params: ConnectionParameters,
    transaction: TransactionCoordinator,
    last_insert_id: LastInsertId,
    closed: bool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("database_type", &self.database_type)
            .field("transaction", &self.transaction.state())
            .field("last_insert_id", &self.last_insert_id.get())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Wrap an opened native handle.
    ///
    /// Puts the session into strict-warning mode, then applies every
    /// passthrough key of `params` as a native session option.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` if either step fails; the
    /// handle is released in that case.
    pub fn open(
        mut handle: Box<dyn NativeHandle>,
        params: ConnectionParameters,
    ) -> Result<Self, DriverError> {
        handle.configure_strict().map_err(|failure| {
            DriverError::ConnectionFailed(translate_last_error(Operation::Configure, failure))
        })?;

        for option in params.session_options()? {
            debug!(name = %option.name, value = %option.value, "applying session option");
            handle
                .apply_session_option(&option.name, &option.value)
                .map_err(|failure| {
                    DriverError::ConnectionFailed(translate_last_error(
                        Operation::Configure,
                        failure,
                    ))
                })?;
        }

        let database_type = handle.database_type();
        let platform = handle.platform();
        debug!(?database_type, "connection opened");

        Ok(Self {
            handle: RefCell::new(handle),
            database_type,
            platform,
            params,
            transaction: TransactionCoordinator::new(),
            last_insert_id: LastInsertId::new(),
            closed: false,
        })
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    /// Parameters the connection was opened with.
    #[must_use]
    pub fn parameters(&self) -> &ConnectionParameters {
        &self.params
    }

    #[must_use]
    pub fn transaction_state(&self) -> TransactionState {
        self.transaction.state()
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_active()
    }

    /// Create a statement for `sql` without executing it.
    ///
    /// # Errors
    /// Returns `DriverError::PrepareFailed` for blank SQL or SQL containing a
    /// NUL byte. Anything else is left for the backend to reject on execution.
    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>, DriverError> {
        if sql.trim().is_empty() {
            return Err(DriverError::PrepareFailed(NormalizedError::local(
                Operation::Prepare,
                "statement text is empty",
            )));
        }
        if sql.contains('\0') {
            return Err(DriverError::PrepareFailed(NormalizedError::local(
                Operation::Prepare,
                "statement text contains a NUL byte",
            )));
        }
        Ok(Statement::new(self, sql.to_string()))
    }

    /// Prepare and execute `sql` without parameters, ready for fetching.
    ///
    /// # Errors
    /// Fails as [`Connection::prepare`] or [`Statement::execute`] do.
    pub fn query(&self, sql: &str) -> Result<Statement<'_>, DriverError> {
        let mut statement = self.prepare(sql)?;
        statement.execute()?;
        Ok(statement)
    }

    /// Execute a statement that returns no rows and report rows affected.
    ///
    /// # Errors
    /// Returns `DriverError::ExecutionFailed` if the backend rejects the
    /// statement (operation `Execute`) or cannot report how many rows changed
    /// (operation `RowsAffected`).
    pub fn exec(&self, sql: &str) -> Result<u64, DriverError> {
        if sql.trim().is_empty() {
            return Err(DriverError::ExecutionFailed(NormalizedError::local(
                Operation::Execute,
                "statement text is empty",
            )));
        }
        debug!(sql, "exec");
        let outcome = self
            .native(Operation::Execute, |handle| handle.execute(sql, &[]))
            .map_err(|err| {
                self.reconcile_transaction();
                DriverError::ExecutionFailed(err)
            })?;

        if StatementKind::classify(sql).inserts {
            self.capture_identity()?;
        }

        outcome.rows_affected.ok_or_else(|| {
            DriverError::ExecutionFailed(NormalizedError::local(
                Operation::RowsAffected,
                "the backend could not report the number of rows affected",
            ))
        })
    }

    /// See [`quote`].
    #[must_use]
    pub fn quote(&self, input: &str) -> String {
        quote(input)
    }

    /// Last generated identity, as text.
    ///
    /// With a sequence name, reads the current value of that sequence through
    /// one parameterised query. Without one, reads the identity most recently
    /// generated on this session, never another connection's.
    ///
    /// When nothing has been generated yet `SQLite` answers `"0"` and SQL Server
    /// answers `""`. An unknown sequence name answers `""`.
    ///
    /// # Errors
    /// Fails as [`Connection::query`] and [`Statement::fetch_text`] do.
    pub fn last_insert_id(&self, name: Option<&str>) -> Result<String, DriverError> {
        let mut statement = match name {
            Some(name) => {
                let mut statement = self.prepare(self.platform.sequence_sql)?;
                statement.execute_with(&[RowValues::Text(name.to_string())])?;
                statement
            }
            None => self.query(self.platform.identity_sql)?,
        };
        statement.fetch_text(0)
    }

    /// Identity recorded after the most recent insert run through this
    /// connection, without asking the backend.
    #[must_use]
    pub fn tracked_insert_id(&self) -> Option<String> {
        self.last_insert_id.get()
    }

    /// # Errors
    /// Returns `DriverError::TransactionFailed` if a transaction is already
    /// active or the backend refuses to start one.
    pub fn begin_transaction(&self) -> Result<(), DriverError> {
        self.transaction.begin(|| {
            self.native(Operation::BeginTransaction, |handle| handle.begin())
        })
    }

    /// A failed commit leaves the transaction active only if the backend
    /// still reports it open.
    ///
    /// # Errors
    /// Returns `DriverError::TransactionFailed` if no transaction is active or
    /// the backend commit fails.
    pub fn commit(&self) -> Result<(), DriverError> {
        self.transaction.commit(|| {
            self.native(Operation::Commit, |handle| handle.commit())
                .inspect_err(|_| self.reconcile_transaction())
        })
    }

    /// # Errors
    /// Returns `DriverError::TransactionFailed` if no transaction is active or
    /// the backend rollback fails.
    pub fn roll_back(&self) -> Result<(), DriverError> {
        self.transaction.roll_back(|| {
            self.native(Operation::RollBack, |handle| handle.rollback())
                .inspect_err(|_| self.reconcile_transaction())
        })
    }

    /// Run `work` inside a transaction: commit when it returns `Ok`, roll back
    /// when it returns `Err`.
    ///
    /// # Errors
    /// Returns the error from beginning, from `work` or from committing. A
    /// failed rollback after `work` failed is logged and `work`'s error wins.
    pub fn transactional<T, F>(&self, work: F) -> Result<T, DriverError>
    where
        F: FnOnce(&Connection) -> Result<T, DriverError>,
    {
        self.begin_transaction()?;
        match work(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if !self.in_transaction() {
                    return Err(err);
                }
                if let Err(rollback_err) = self.roll_back() {
                    warn!(error = %rollback_err, "rollback after failed transactional work failed");
                }
                Err(err)
            }
        }
    }

    /// Server version string.
    ///
    /// Read from connection metadata when the backend exposes it, otherwise
    /// queried; see [`Connection::requires_query_for_server_version`].
    ///
    /// # Errors
    /// Returns `DriverError::ExecutionFailed` if the metadata call or the
    /// version query fails.
    pub fn server_version(&self) -> Result<String, DriverError> {
        let reported = self
            .native(Operation::ServerInfo, |handle| handle.server_version())
            .map_err(DriverError::ExecutionFailed)?;
        if let Some(version) = reported {
            return Ok(version);
        }
        match self.platform.server_version_sql {
            Some(sql) => self.query(sql)?.fetch_text(0),
            None => Err(DriverError::ExecutionFailed(NormalizedError::local(
                Operation::ServerInfo,
                "the backend reports no server version",
            ))),
        }
    }

    /// Whether [`Connection::server_version`] costs a query round trip.
    #[must_use]
    pub fn requires_query_for_server_version(&self) -> bool {
        self.platform.server_version_sql.is_some()
    }

    /// Name of the database the session is using, when the backend can say.
    ///
    /// # Errors
    /// Fails as [`Connection::query`] does.
    pub fn current_database(&self) -> Result<Option<String>, DriverError> {
        let Some(sql) = self.platform.current_database_sql else {
            return Ok(None);
        };
        let value = self.query(sql)?.fetch_column(0)?;
        Ok(value.and_then(|v| v.to_text()))
    }

    /// Roll back any open transaction and release the native handle now,
    /// reporting failures that dropping would only log.
    ///
    /// # Errors
    /// Returns `DriverError::TransactionFailed` if the pending rollback fails
    /// or `DriverError::ConnectionFailed` if the handle cannot be released.
    pub fn close(mut self) -> Result<(), DriverError> {
        if self.in_transaction() {
            self.roll_back()?;
        }
        self.closed = true;
        self.native(Operation::Close, |handle| handle.close())
            .map_err(DriverError::ConnectionFailed)
    }

    pub(crate) fn native<T, F>(&self, operation: Operation, call: F) -> Result<T, NormalizedError>
    where
        F: FnOnce(&mut dyn NativeHandle) -> NativeResult<T>,
    {
        let mut handle = self.handle.borrow_mut();
        call(&mut **handle).map_err(|failure| translate_last_error(operation, failure))
    }

    /// Ask the backend whether a transaction is still open after a failure
    /// and follow its answer. Backends roll back on their own on some errors.
    pub(crate) fn reconcile_transaction(&self) {
        match self.native(Operation::TransactionStatus, |handle| handle.in_transaction()) {
            Ok(active) => self.transaction.sync(active),
            Err(err) => warn!(error = %err, "could not read the backend transaction state"),
        }
    }

    pub(crate) fn capture_identity(&self) -> Result<(), DriverError> {
        let id = self
            .native(Operation::Identity, |handle| handle.last_generated_id())
            .map_err(DriverError::ExecutionFailed)?;
        self.last_insert_id.set(id);
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let handle = self.handle.get_mut();
        if self.transaction.is_active() {
            if let Err(failure) = handle.rollback() {
                let err = translate_last_error(Operation::RollBack, failure);
                warn!(error = %err, "rollback of abandoned transaction failed");
            }
        }
        if let Err(failure) = handle.close() {
            let err = translate_last_error(Operation::Close, failure);
            warn!(error = %err, "closing native handle failed");
        }
    }
}
