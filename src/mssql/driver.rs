use super::config::MssqlOptions;
use super::handle::MssqlHandle;
use crate::connection::Connection;
use crate::driver::{Driver, with_credentials};
use crate::error::DriverError;
use crate::params::ConnectionParameters;
use crate::translator::{Operation, translate_last_error};
use crate::types::DatabaseType;

/// Opens tiberius connections with SQL Server authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlDriver;

impl Driver for MssqlDriver {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mssql
    }

    fn connect(
        &self,
        params: &ConnectionParameters,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Connection, DriverError> {
        let params = with_credentials(params, user, password);
        let options = MssqlOptions::from_parameters(&params)?;
        let handle = MssqlHandle::open(&options).map_err(|failure| {
            DriverError::ConnectionFailed(translate_last_error(Operation::Connect, failure))
        })?;
        Connection::open(Box::new(handle), params)
    }

    /// The configured `dbname`, or the login's default database as reported
    /// by the server.
    fn get_database(&self, conn: &Connection) -> Result<Option<String>, DriverError> {
        match conn.parameters().dbname() {
            Some(dbname) => Ok(Some(dbname.to_string())),
            None => conn.current_database(),
        }
    }
}
