use tracing::debug;

use super::config::SqliteOptions;
use crate::connection::Connection;
use crate::driver::Driver;
use crate::error::DriverError;
use crate::params::ConnectionParameters;
use crate::types::DatabaseType;

/// Opens rusqlite connections. Credentials are accepted and ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn connect(
        &self,
        params: &ConnectionParameters,
        user: Option<&str>,
        _password: Option<&str>,
    ) -> Result<Connection, DriverError> {
        if user.is_some() || params.user().is_some() {
            debug!("sqlite ignores credentials");
        }
        let handle = SqliteOptions::from_parameters(params)?.open()?;
        Connection::open(Box::new(handle), params.clone())
    }

    fn get_database(&self, conn: &Connection) -> Result<Option<String>, DriverError> {
        Ok(SqliteOptions::from_parameters(conn.parameters())?.db_path)
    }
}
