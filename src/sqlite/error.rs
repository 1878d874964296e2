use rusqlite::ffi::ErrorCode;

use crate::translator::{DiagnosticRecord, NativeFailure};

/// SQLSTATE class for a rusqlite failure, where one is well known.
///
/// `SQLite` reports most statement errors under the generic `SQLITE_ERROR`
/// code, so those are told apart by message.
fn sql_state(err: &rusqlite::Error) -> Option<&'static str> {
    let code = err.sqlite_error()?.code;
    match code {
        ErrorCode::ConstraintViolation => Some("23000"),
        ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => Some("40001"),
        ErrorCode::Unknown => {
            let message = err.to_string();
            if message.contains("no such table") {
                Some("42S02")
            } else if message.contains("no such column") {
                Some("42S22")
            } else if message.contains("syntax error") || message.contains("incomplete input") {
                Some("42000")
            } else {
                None
            }
        }
        _ => None,
    }
}

impl From<rusqlite::Error> for NativeFailure {
    fn from(err: rusqlite::Error) -> Self {
        let code = err.sqlite_error().map(|e| i64::from(e.extended_code));
        let state = sql_state(&err);
        NativeFailure::single(DiagnosticRecord::new(code, state, err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::{Operation, translate_last_error};

    fn failure_for(sql: &str) -> NativeFailure {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .unwrap();
        conn.execute_batch(sql).unwrap_err().into()
    }

    #[test]
    fn constraint_violations_map_to_integrity_class() {
        let err = translate_last_error(
            Operation::Execute,
            failure_for("INSERT INTO t (id, name) VALUES (1, NULL)"),
        );
        assert_eq!(err.sql_state(), Some("23000"));
        assert!(err.code().is_some());
    }

    #[test]
    fn missing_objects_and_syntax_are_classified() {
        let err = translate_last_error(Operation::Execute, failure_for("SELECT * FROM nope"));
        assert_eq!(err.sql_state(), Some("42S02"));

        let err = translate_last_error(Operation::Execute, failure_for("SELECT nope FROM t"));
        assert_eq!(err.sql_state(), Some("42S22"));

        let err = translate_last_error(Operation::Execute, failure_for("SELEC 1"));
        assert_eq!(err.sql_state(), Some("42000"));
    }
}
