//! Prepared or ad-hoc statements bound to a [`Connection`].

mod kind;

use std::sync::Arc;

use tracing::debug;

pub use kind::StatementKind;

use crate::connection::Connection;
use crate::error::DriverError;
use crate::results::CustomDbRow;
use crate::translator::{NormalizedError, Operation};
use crate::types::RowValues;

/// Lifecycle of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Created, nothing bound yet.
    Unprepared,
    /// Parameters bound, not executed since.
    Prepared,
    /// Executed, no row fetched yet.
    Executed,
    /// At least one row fetched, more may follow.
    Fetching,
    /// Every row has been consumed.
    Exhausted,
}

/// A command bound to the connection it was prepared on.
///
/// Borrowing the connection keeps the statement from outliving the native
/// handle. Validation of the SQL text happens on first execution, not at
/// prepare time. Result rows are buffered when the statement executes and
/// handed out one at a time.
pub struct Statement<'c> {
    conn: &'c Connection,
    sql: String,
    kind: StatementKind,
    params: Vec<RowValues>,
    state: StatementState,
    cursor: std::vec::IntoIter<CustomDbRow>,
    column_names: Option<Arc<Vec<String>>>,
    row_count: Option<u64>,
}

impl std::fmt::Debug for Statement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("state", &self.state)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

impl<'c> Statement<'c> {
    pub(crate) fn new(conn: &'c Connection, sql: String) -> Self {
        let kind = StatementKind::classify(&sql);
        Self {
            conn,
            sql,
            kind,
            params: Vec::new(),
            state: StatementState::Unprepared,
            cursor: Vec::new().into_iter(),
            column_names: None,
            row_count: None,
        }
    }

    /// Access the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn state(&self) -> StatementState {
        self.state
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Parameters that the next execution will send.
    #[must_use]
    pub fn parameters(&self) -> &[RowValues] {
        &self.params
    }

    /// Replace all positional parameters. Allowed after execution; any unread
    /// rows from the previous execution are discarded.
    pub fn bind_parameters<I>(&mut self, values: I)
    where
        I: IntoIterator,
        I::Item: Into<RowValues>,
    {
        self.params = values.into_iter().map(Into::into).collect();
        self.reset(StatementState::Prepared);
    }

    /// Bind a single parameter at a 1-based position. Gaps are filled with NULL.
    ///
    /// # Errors
    /// Returns `DriverError::PrepareFailed` for position 0.
    pub fn bind_value(
        &mut self,
        position: usize,
        value: impl Into<RowValues>,
    ) -> Result<(), DriverError> {
        if position == 0 {
            return Err(DriverError::PrepareFailed(NormalizedError::local(
                Operation::Prepare,
                "parameter positions start at 1",
            )));
        }
        if self.params.len() < position {
            self.params.resize(position, RowValues::Null);
        }
        self.params[position - 1] = value.into();
        self.reset(StatementState::Prepared);
        Ok(())
    }

    /// Execute with the currently bound parameters.
    ///
    /// # Errors
    /// Returns `DriverError::ExecutionFailed` if the backend rejects the
    /// statement, or if the identity of an insert cannot be read back. In the
    /// second case the statement still counts as executed and its rows can be
    /// fetched.
    pub fn execute(&mut self) -> Result<(), DriverError> {
        self.reset(self.state);
        let conn = self.conn;
        debug!(sql = %self.sql, params = self.params.len(), "executing statement");

        if self.kind.returns_rows {
            let result_set = conn
                .native(Operation::Execute, |handle| {
                    handle.query(&self.sql, &self.params)
                })
                .map_err(|err| self.execution_failed(err))?;
            self.row_count = u64::try_from(result_set.rows_affected).ok();
            self.column_names = result_set.get_column_names().cloned();
            self.cursor = result_set.into_iter();
        } else {
            let outcome = conn
                .native(Operation::Execute, |handle| {
                    handle.execute(&self.sql, &self.params)
                })
                .map_err(|err| self.execution_failed(err))?;
            self.row_count = outcome.rows_affected;
        }

        self.state = StatementState::Executed;
        if self.kind.inserts {
            conn.capture_identity()?;
        }
        Ok(())
    }

    fn execution_failed(&self, err: NormalizedError) -> DriverError {
        self.conn.reconcile_transaction();
        DriverError::ExecutionFailed(err)
    }

    /// Bind `params` and execute.
    ///
    /// # Errors
    /// See [`Statement::execute`].
    pub fn execute_with(&mut self, params: &[RowValues]) -> Result<(), DriverError> {
        self.bind_parameters(params.iter().cloned());
        self.execute()
    }

    /// Advance to the next row. `Ok(None)` once every row has been read.
    ///
    /// # Errors
    /// Returns `DriverError::FetchFailed` if the statement has not been executed.
    pub fn fetch(&mut self) -> Result<Option<CustomDbRow>, DriverError> {
        self.ensure_executed()?;
        Ok(self.next_row())
    }

    /// Advance one row and return the value at column `index`.
    ///
    /// Returns `Ok(None)` when no rows remain; a SQL NULL is
    /// `Some(RowValues::Null)`.
    ///
    /// # Errors
    /// Returns `DriverError::FetchFailed` if the statement has not been
    /// executed or the row has no column `index`.
    pub fn fetch_column(&mut self, index: usize) -> Result<Option<RowValues>, DriverError> {
        let Some(row) = self.fetch()? else {
            return Ok(None);
        };
        let width = row.len();
        row.into_value(index).map(Some).ok_or_else(|| {
            DriverError::FetchFailed(NormalizedError::local(
                Operation::Fetch,
                format!("column index {index} out of range for a row of {width} columns"),
            ))
        })
    }

    /// Advance one row and return column `index` as text.
    ///
    /// An exhausted result and a SQL NULL both yield an empty string, which is
    /// the contract identity lookups rely on.
    ///
    /// # Errors
    /// See [`Statement::fetch_column`].
    pub fn fetch_text(&mut self, index: usize) -> Result<String, DriverError> {
        Ok(self
            .fetch_column(index)?
            .and_then(|value| value.to_text())
            .unwrap_or_default())
    }

    /// Drain every remaining row.
    ///
    /// # Errors
    /// Returns `DriverError::FetchFailed` if the statement has not been executed.
    pub fn fetch_all(&mut self) -> Result<Vec<CustomDbRow>, DriverError> {
        Ok(self.rows()?.collect())
    }

    /// Lazily iterate the remaining rows. The sequence cannot be restarted
    /// without executing again.
    ///
    /// # Errors
    /// Returns `DriverError::FetchFailed` if the statement has not been executed.
    pub fn rows(&mut self) -> Result<Rows<'_, 'c>, DriverError> {
        self.ensure_executed()?;
        Ok(Rows { statement: self })
    }

    /// Column names of the last result, if it had any.
    #[must_use]
    pub fn column_names(&self) -> Option<&[String]> {
        self.column_names
            .as_deref()
            .map(Vec::as_slice)
            .filter(|names| !names.is_empty())
    }

    /// Rows affected by the last execution, or rows returned for queries.
    /// `None` before execution or when the backend could not say.
    #[must_use]
    pub fn row_count(&self) -> Option<u64> {
        self.row_count
    }

    fn reset(&mut self, state: StatementState) {
        self.cursor = Vec::new().into_iter();
        self.column_names = None;
        self.row_count = None;
        self.state = match state {
            StatementState::Unprepared => StatementState::Unprepared,
            _ => StatementState::Prepared,
        };
    }

    fn ensure_executed(&self) -> Result<(), DriverError> {
        match self.state {
            StatementState::Unprepared | StatementState::Prepared => {
                Err(DriverError::FetchFailed(NormalizedError::local(
                    Operation::Fetch,
                    "statement has not been executed",
                )))
            }
            _ => Ok(()),
        }
    }

    fn next_row(&mut self) -> Option<CustomDbRow> {
        if self.state == StatementState::Exhausted {
            return None;
        }
        let row = self.cursor.next();
        self.state = if row.is_some() {
            StatementState::Fetching
        } else {
            StatementState::Exhausted
        };
        row
    }
}

/// Iterator over the remaining rows of an executed [`Statement`].
pub struct Rows<'s, 'c> {
    statement: &'s mut Statement<'c>,
}

impl Iterator for Rows<'_, '_> {
    type Item = CustomDbRow;

    fn next(&mut self) -> Option<Self::Item> {
        self.statement.next_row()
    }
}
