//! The contract every backend's native client wrapper fulfils.
//!
//! A [`NativeHandle`] owns exactly one native connection. It never produces a
//! [`crate::DriverError`] itself: failures come back as [`NativeFailure`](crate::translator::NativeFailure) and
//! the owning [`crate::Connection`] translates them.

use crate::params::ParamValue;
use crate::results::ResultSet;
use crate::translation::PlaceholderStyle;
use crate::translator::NativeResult;
use crate::types::{DatabaseType, RowValues};

/// Outcome of a statement that produced no result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeExecution {
    /// Rows changed, or `None` when the native layer could not report a count.
    pub rows_affected: Option<u64>,
}

impl NativeExecution {
    #[must_use]
    pub fn affected(rows: u64) -> Self {
        Self {
            rows_affected: Some(rows),
        }
    }

    #[must_use]
    pub fn undetermined() -> Self {
        Self {
            rows_affected: None,
        }
    }
}

/// Backend SQL used by the generic connection for metadata lookups.
///
/// Every query takes its parameters positionally with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub placeholders: PlaceholderStyle,
    /// Session-scoped last generated identity, as text.
    pub identity_sql: &'static str,
    /// Current value of the sequence whose name is bound as the only parameter.
    pub sequence_sql: &'static str,
    /// Query for the server version when the handle cannot report it from
    /// connection metadata.
    pub server_version_sql: Option<&'static str>,
    /// Query for the active database name, when the backend can answer it.
    pub current_database_sql: Option<&'static str>,
}

/// Raw primitives of one open native connection.
///
/// Implementations are used from one thread at a time; `Send` lets a
/// connection move to a worker thread.
pub trait NativeHandle: Send {
    fn database_type(&self) -> DatabaseType;

    fn platform(&self) -> &'static Platform;

    /// Put the session into the mode where recoverable warnings are raised as
    /// errors instead of being ignored.
    fn configure_strict(&mut self) -> NativeResult<()>;

    /// Apply a passthrough session option verbatim.
    fn apply_session_option(&mut self, name: &str, value: &ParamValue) -> NativeResult<()>;

    /// Run a statement that is not expected to return rows.
    fn execute(&mut self, sql: &str, params: &[RowValues]) -> NativeResult<NativeExecution>;

    /// Run a statement and buffer its rows. A statement that turns out to
    /// produce no columns yields a [`ResultSet`] without column names.
    fn query(&mut self, sql: &str, params: &[RowValues]) -> NativeResult<ResultSet>;

    /// Identity generated by the most recent insert on this session, read
    /// through the native client when it exposes one. `None` when nothing was
    /// generated.
    fn last_generated_id(&mut self) -> NativeResult<Option<String>>;

    fn begin(&mut self) -> NativeResult<()>;

    fn commit(&mut self) -> NativeResult<()>;

    fn rollback(&mut self) -> NativeResult<()>;

    /// Whether the native session has a transaction open right now. Backends
    /// may end a transaction on their own, e.g. when a statement fails.
    fn in_transaction(&mut self) -> NativeResult<bool>;

    /// Version reported by connection metadata, without a round trip. `None`
    /// when the backend needs [`Platform::server_version_sql`] instead.
    fn server_version(&mut self) -> NativeResult<Option<String>>;

    /// Release the native connection. Further calls fail; calling twice is a no-op.
    fn close(&mut self) -> NativeResult<()>;
}
