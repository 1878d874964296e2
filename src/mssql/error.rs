use tiberius::error::Error;

use crate::translator::{DiagnosticRecord, NativeFailure};

/// SQLSTATE class for a SQL Server error number, where one is well known.
fn sql_state(code: u32) -> Option<&'static str> {
    match code {
        // unique index, primary key, foreign key / check
        2601 | 2627 | 547 | 515 => Some("23000"),
        1205 => Some("40001"),
        208 => Some("42S02"),
        207 => Some("42S22"),
        102 | 156 => Some("42000"),
        _ => None,
    }
}

impl From<Error> for NativeFailure {
    fn from(err: Error) -> Self {
        let record = match &err {
            Error::Server(token) => DiagnosticRecord::new(
                Some(i64::from(token.code())),
                sql_state(token.code()),
                token.message(),
            ),
            Error::Io { .. } => DiagnosticRecord::new(None, Some("08S01"), err.to_string()),
            Error::Tls(_) | Error::Routing { .. } => {
                DiagnosticRecord::new(None, Some("08001"), err.to_string())
            }
            _ => DiagnosticRecord::message(err.to_string()),
        };
        NativeFailure::single(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_codes_have_sql_states() {
        assert_eq!(sql_state(2627), Some("23000"));
        assert_eq!(sql_state(1205), Some("40001"));
        assert_eq!(sql_state(208), Some("42S02"));
        assert_eq!(sql_state(207), Some("42S22"));
        assert_eq!(sql_state(102), Some("42000"));
        assert_eq!(sql_state(50000), None);
    }

    #[test]
    fn client_side_errors_keep_their_message() {
        let failure = NativeFailure::from(Error::Conversion("bad value".into()));
        let record = &failure.records()[0];
        assert_eq!(record.code, None);
        assert!(record.message.contains("bad value"));
    }
}
