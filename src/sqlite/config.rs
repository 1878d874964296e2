use tracing::debug;

use crate::error::DriverError;
use crate::params::{ConnectionParameters, MEMORY, PATH};
use crate::translator::{Operation, translate_last_error};

use super::handle::SqliteHandle;

/// Options for opening a `SQLite` connection.
///
/// `db_path` of `None` opens a private in-memory database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqliteOptions {
    pub db_path: Option<String>,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: Some(db_path.into()),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Resolve options from connection parameters.
    ///
    /// The file comes from `path`, falling back to `dbname`. `memory = true`
    /// or the path `:memory:` selects an in-memory database, as does leaving
    /// both keys out.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` if `memory` is not a boolean.
    pub fn from_parameters(params: &ConnectionParameters) -> Result<Self, DriverError> {
        let memory = match params.get(MEMORY) {
            None => false,
            Some(value) => value.as_flag().ok_or_else(|| {
                DriverError::config(format!("memory must be a boolean, got {value}"))
            })?,
        };
        if memory {
            return Ok(Self::in_memory());
        }

        let db_path = params
            .get_str(PATH)
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .or_else(|| params.dbname())
            .filter(|path| *path != ":memory:")
            .map(str::to_string);
        Ok(Self { db_path })
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    /// Open the native handle these options describe.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` if rusqlite cannot open the file.
    pub fn open(&self) -> Result<SqliteHandle, DriverError> {
        debug!(path = ?self.db_path, "opening sqlite database");
        SqliteHandle::open(self.db_path.as_deref()).map_err(|failure| {
            DriverError::ConnectionFailed(translate_last_error(Operation::Connect, failure))
        })
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone, Default)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn path(mut self, db_path: impl Into<String>) -> Self {
        self.opts.db_path = Some(db_path.into());
        self
    }

    #[must_use]
    pub fn memory(mut self) -> Self {
        self.opts.db_path = None;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn path_wins_over_dbname() {
        let params = ConnectionParameters::new()
            .with("path", "/tmp/a.db")
            .with("dbname", "/tmp/b.db");
        let opts = SqliteOptions::from_parameters(&params).unwrap();
        assert_eq!(opts.db_path.as_deref(), Some("/tmp/a.db"));

        let params = ConnectionParameters::new().with("database", "/tmp/b.db");
        let opts = SqliteOptions::from_parameters(&params).unwrap();
        assert_eq!(opts.db_path.as_deref(), Some("/tmp/b.db"));
    }

    #[test]
    fn missing_database_means_memory() {
        let opts = SqliteOptions::from_parameters(&ConnectionParameters::new()).unwrap();
        assert!(opts.is_in_memory());

        let params = ConnectionParameters::new()
            .with("path", "/tmp/a.db")
            .with("memory", true);
        assert!(SqliteOptions::from_parameters(&params).unwrap().is_in_memory());

        let params = ConnectionParameters::new().with("path", ":memory:");
        assert!(SqliteOptions::from_parameters(&params).unwrap().is_in_memory());
    }

    #[test]
    fn memory_flag_must_be_boolean() {
        let params = ConnectionParameters::new().with("memory", "sometimes");
        let err = SqliteOptions::from_parameters(&params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }

    #[test]
    fn builder_sets_path() {
        let opts = SqliteOptionsBuilder::new().path("x.db").finish();
        assert_eq!(opts, SqliteOptions::new("x.db"));
        assert!(SqliteOptionsBuilder::new().path("x.db").memory().finish().is_in_memory());
    }
}
