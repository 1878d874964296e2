use rusqlite::{Connection, params_from_iter};
use tracing::debug;

use super::params::{convert_params, param_value_to_pragma};
use super::query::build_result_set;
use crate::native::{NativeExecution, NativeHandle, Platform};
use crate::params::ParamValue;
use crate::results::ResultSet;
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::translator::{NativeFailure, NativeResult};
use crate::types::{DatabaseType, RowValues};

static PLATFORM: Platform = Platform {
    placeholders: PlaceholderStyle::Sqlite,
    identity_sql: "SELECT CAST(last_insert_rowid() AS TEXT)",
    sequence_sql: "SELECT CAST(seq AS TEXT) FROM sqlite_sequence WHERE name = ?",
    server_version_sql: None,
    current_database_sql: None,
};

/// One rusqlite connection.
#[derive(Debug)]
pub struct SqliteHandle {
    conn: Option<Connection>,
}

impl SqliteHandle {
    /// Open the database file at `path`, or a private in-memory database.
    ///
    /// # Errors
    /// Returns the native failure if rusqlite cannot open the database.
    pub fn open(path: Option<&str>) -> NativeResult<Self> {
        let conn = match path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        Ok(Self::from_connection(conn))
    }

    /// Wrap a connection the caller already opened.
    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Some(conn) }
    }

    fn conn(&self) -> NativeResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| NativeFailure::message("sqlite connection is closed"))
    }
}

/// Run a pragma, discarding the value some pragmas echo back.
fn run_pragma(conn: &Connection, sql: &str) -> NativeResult<()> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(())
}

impl NativeHandle for SqliteHandle {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn platform(&self) -> &'static Platform {
        &PLATFORM
    }

    fn configure_strict(&mut self) -> NativeResult<()> {
        let conn = self.conn()?;
        run_pragma(conn, "PRAGMA foreign_keys = ON")?;
        let enabled: bool = conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
        if enabled {
            Ok(())
        } else {
            Err(NativeFailure::message(
                "foreign key enforcement could not be enabled",
            ))
        }
    }

    fn apply_session_option(&mut self, name: &str, value: &ParamValue) -> NativeResult<()> {
        let sql = format!("PRAGMA {name} = {}", param_value_to_pragma(value));
        run_pragma(self.conn()?, &sql)
    }

    fn execute(&mut self, sql: &str, params: &[RowValues]) -> NativeResult<NativeExecution> {
        let conn = self.conn()?;
        let sql = translate_placeholders(sql, PLATFORM.placeholders);
        let values = convert_params(params);
        let mut stmt = conn.prepare(&sql)?;
        let changed = if stmt.column_count() > 0 {
            // rows are counted and dropped, as with INSERT ... RETURNING
            let mut rows = stmt.query(params_from_iter(values.iter()))?;
            let mut returned = 0usize;
            while rows.next()?.is_some() {
                returned += 1;
            }
            returned
        } else {
            stmt.execute(params_from_iter(values.iter()))?
        };
        Ok(NativeExecution {
            rows_affected: u64::try_from(changed).ok(),
        })
    }

    fn query(&mut self, sql: &str, params: &[RowValues]) -> NativeResult<ResultSet> {
        let conn = self.conn()?;
        let sql = translate_placeholders(sql, PLATFORM.placeholders);
        let values = convert_params(params);
        let mut stmt = conn.prepare(&sql)?;
        Ok(build_result_set(&mut stmt, &values)?)
    }

    fn last_generated_id(&mut self) -> NativeResult<Option<String>> {
        let rowid = self.conn()?.last_insert_rowid();
        Ok((rowid != 0).then(|| rowid.to_string()))
    }

    fn begin(&mut self) -> NativeResult<()> {
        Ok(self.conn()?.execute_batch("BEGIN")?)
    }

    fn commit(&mut self) -> NativeResult<()> {
        Ok(self.conn()?.execute_batch("COMMIT")?)
    }

    fn rollback(&mut self) -> NativeResult<()> {
        Ok(self.conn()?.execute_batch("ROLLBACK")?)
    }

    fn in_transaction(&mut self) -> NativeResult<bool> {
        Ok(!self.conn()?.is_autocommit())
    }

    fn server_version(&mut self) -> NativeResult<Option<String>> {
        Ok(Some(rusqlite::version().to_string()))
    }

    fn close(&mut self) -> NativeResult<()> {
        if let Some(conn) = self.conn.take() {
            debug!("closing sqlite connection");
            conn.close().map_err(|(_conn, err)| err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_mode_turns_on_foreign_keys() {
        let mut handle = SqliteHandle::open(None).unwrap();
        handle.configure_strict().unwrap();
        let rs = handle.query("PRAGMA foreign_keys", &[]).unwrap();
        let row = rs.into_iter().next().unwrap();
        assert_eq!(row.get_by_index(0), Some(&RowValues::Int(1)));
    }

    #[test]
    fn placeholders_are_numbered_before_binding() {
        let mut handle = SqliteHandle::open(None).unwrap();
        let rs = handle
            .query("SELECT ? || ?", &[RowValues::from("a"), RowValues::from("b")])
            .unwrap();
        let row = rs.into_iter().next().unwrap();
        assert_eq!(row.get_by_index(0).and_then(RowValues::as_text), Some("ab"));
    }

    #[test]
    fn closed_handle_refuses_work() {
        let mut handle = SqliteHandle::open(None).unwrap();
        handle.close().unwrap();
        handle.close().unwrap();
        assert!(handle.execute("SELECT 1", &[]).is_err());
    }

    #[test]
    fn identity_is_absent_until_an_insert() {
        let mut handle = SqliteHandle::open(None).unwrap();
        assert_eq!(handle.last_generated_id().unwrap(), None);
        handle
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
            .unwrap();
        handle.execute("INSERT INTO t DEFAULT VALUES", &[]).unwrap();
        assert_eq!(handle.last_generated_id().unwrap().as_deref(), Some("1"));
    }
}
