//! Conversion of native diagnostics into [`NormalizedError`].
//!
//! Native handles never report failures through the public error type. They
//! return a [`NativeFailure`] carrying every diagnostic record the client
//! library produced for that call; [`translate_last_error`] consumes it (so a
//! failure cannot be translated twice or dropped on the floor unnoticed) and
//! folds all records into one normalized value.

use std::fmt;

/// The public operation during which a native failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Configure,
    Connect,
    Prepare,
    Execute,
    RowsAffected,
    Identity,
    Fetch,
    BeginTransaction,
    Commit,
    RollBack,
    TransactionStatus,
    ServerInfo,
    Close,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Configure => "configure",
            Operation::Connect => "connect",
            Operation::Prepare => "prepare",
            Operation::Execute => "execute",
            Operation::RowsAffected => "rows affected",
            Operation::Identity => "identity",
            Operation::Fetch => "fetch",
            Operation::BeginTransaction => "begin transaction",
            Operation::Commit => "commit",
            Operation::RollBack => "rollback",
            Operation::TransactionStatus => "transaction status",
            Operation::ServerInfo => "server info",
            Operation::Close => "close",
        };
        f.write_str(name)
    }
}

/// One diagnostic record as reported by a native client library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Backend-native error number, when the backend has one.
    pub code: Option<i64>,
    /// Five-character SQLSTATE class, when known.
    pub sql_state: Option<String>,
    pub message: String,
}

impl DiagnosticRecord {
    #[must_use]
    pub fn new(code: Option<i64>, sql_state: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code,
            sql_state: sql_state.map(str::to_string),
            message: message.into(),
        }
    }

    /// A record with no native code or state, only text.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(None, None, message)
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(state) = &self.sql_state {
            write!(f, "SQLSTATE [{state}] ")?;
        }
        if let Some(code) = self.code {
            write!(f, "[{code}] ")?;
        }
        f.write_str(&self.message)
    }
}

/// Failure signalled by a native handle call, holding all pending records.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a native failure must be translated"]
pub struct NativeFailure {
    records: Vec<DiagnosticRecord>,
}

impl NativeFailure {
    #[must_use = "a native failure must be translated"]
    pub fn new(records: Vec<DiagnosticRecord>) -> Self {
        Self { records }
    }

    #[must_use = "a native failure must be translated"]
    pub fn single(record: DiagnosticRecord) -> Self {
        Self {
            records: vec![record],
        }
    }

    #[must_use = "a native failure must be translated"]
    pub fn message(message: impl Into<String>) -> Self {
        Self::single(DiagnosticRecord::message(message))
    }

    /// Add another record reported for the same call.
    pub fn push(&mut self, record: DiagnosticRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn records(&self) -> &[DiagnosticRecord] {
        &self.records
    }
}

/// Shorthand for native handle return values.
pub type NativeResult<T> = Result<T, NativeFailure>;

/// Backend-neutral error details carried by every [`crate::DriverError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    operation: Operation,
    code: Option<i64>,
    sql_state: Option<String>,
    message: String,
    records: Vec<DiagnosticRecord>,
}

impl NormalizedError {
    /// Error raised by this crate itself rather than by a native call, such as
    /// an invalid transaction transition.
    #[must_use]
    pub fn local(operation: Operation, message: impl Into<String>) -> Self {
        translate_last_error(operation, NativeFailure::message(message))
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn code(&self) -> Option<i64> {
        self.code
    }

    #[must_use]
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Every record the native layer reported, in order.
    #[must_use]
    pub fn records(&self) -> &[DiagnosticRecord] {
        &self.records
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: ", self.operation)?;
        if let Some(state) = &self.sql_state {
            write!(f, "SQLSTATE [{state}] ")?;
        }
        if let Some(code) = self.code {
            write!(f, "[{code}] ")?;
        }
        f.write_str(&self.message)
    }
}

impl std::error::Error for NormalizedError {}

/// Translate the failure of a native call into a [`NormalizedError`].
///
/// All records are kept. The error's `code` and `sql_state` come from the first
/// record that carries one; its message joins every record's message.
pub fn translate_last_error(operation: Operation, failure: NativeFailure) -> NormalizedError {
    let records = failure.records;
    let code = records.iter().find_map(|r| r.code);
    let sql_state = records.iter().find_map(|r| r.sql_state.clone());
    let message = if records.is_empty() {
        "native call failed without diagnostics".to_string()
    } else {
        records
            .iter()
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    };

    NormalizedError {
        operation,
        code,
        sql_state,
        message,
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_every_record() {
        let mut failure = NativeFailure::single(DiagnosticRecord::new(
            Some(5701),
            Some("01000"),
            "Changed database context to 'master'.",
        ));
        failure.push(DiagnosticRecord::new(
            Some(208),
            Some("42S02"),
            "Invalid object name 'missing'.",
        ));

        let err = translate_last_error(Operation::Execute, failure);
        assert_eq!(err.records().len(), 2);
        assert_eq!(err.code(), Some(5701));
        assert_eq!(err.sql_state(), Some("01000"));
        assert_eq!(
            err.message(),
            "Changed database context to 'master'.; Invalid object name 'missing'."
        );
    }

    #[test]
    fn code_falls_through_to_first_record_that_has_one() {
        let failure = NativeFailure::new(vec![
            DiagnosticRecord::message("statement terminated"),
            DiagnosticRecord::new(Some(19), None, "constraint failed"),
        ]);
        let err = translate_last_error(Operation::Execute, failure);
        assert_eq!(err.code(), Some(19));
        assert_eq!(err.sql_state(), None);
    }

    #[test]
    fn empty_failure_still_has_a_message() {
        let err = translate_last_error(Operation::Commit, NativeFailure::new(Vec::new()));
        assert!(!err.message().is_empty());
        assert_eq!(err.operation(), Operation::Commit);
    }

    #[test]
    fn display_includes_operation_and_state() {
        let err = translate_last_error(
            Operation::Connect,
            NativeFailure::single(DiagnosticRecord::new(Some(18456), Some("28000"), "Login failed")),
        );
        assert_eq!(
            err.to_string(),
            "connect failed: SQLSTATE [28000] [18456] Login failed"
        );
    }
}
