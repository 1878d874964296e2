//! Entry points that turn [`ConnectionParameters`] into a [`Connection`].

use tracing::debug;

use crate::connection::Connection;
use crate::error::DriverError;
use crate::params::{ConnectionParameters, DRIVER};
use crate::types::DatabaseType;

/// A backend able to open connections.
pub trait Driver {
    fn database_type(&self) -> DatabaseType;

    /// Open a connection from normalised parameters. `user` and `password`
    /// override the matching keys in `params` when given.
    ///
    /// A missing database name never fails here; the backend falls back to
    /// its default.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` if the parameters are invalid or
    /// the backend refuses the connection.
    fn connect(
        &self,
        params: &ConnectionParameters,
        user: Option<&str>,
        password: Option<&str>,
    ) -> Result<Connection, DriverError>;

    /// Name of the database `conn` is using, `None` when there is none to
    /// report.
    ///
    /// # Errors
    /// Returns the error of the lookup query when the backend has to be asked.
    fn get_database(&self, conn: &Connection) -> Result<Option<String>, DriverError>;
}

/// The driver for `database_type`.
#[must_use]
pub fn driver_for(database_type: DatabaseType) -> Box<dyn Driver> {
    match database_type {
        #[cfg(feature = "sqlite")]
        DatabaseType::Sqlite => Box::new(crate::sqlite::SqliteDriver),
        #[cfg(feature = "mssql")]
        DatabaseType::Mssql => Box::new(crate::mssql::MssqlDriver),
        #[cfg(any(test, feature = "test-utils"))]
        DatabaseType::Mock => Box::new(crate::test_utils::MockDriver::default()),
    }
}

/// Open a connection using the backend named by the `driver` parameter.
///
/// # Errors
/// Returns `DriverError::ConnectionFailed` if `driver` is missing or names a
/// backend this build does not include, or if connecting fails.
pub fn connect(params: &ConnectionParameters) -> Result<Connection, DriverError> {
    let name = params
        .driver()
        .ok_or_else(|| DriverError::config(format!("missing `{DRIVER}` parameter")))?;
    let database_type = DatabaseType::parse(name)
        .ok_or_else(|| DriverError::config(format!("unknown driver: {name}")))?;
    debug!(?database_type, "connecting");
    driver_for(database_type).connect(params, None, None)
}

/// Copy of `params` with explicit credentials applied over the stored ones.
pub(crate) fn with_credentials(
    params: &ConnectionParameters,
    user: Option<&str>,
    password: Option<&str>,
) -> ConnectionParameters {
    let mut params = params.clone();
    if let Some(user) = user {
        params.insert(crate::params::USER, user);
    }
    if let Some(password) = password {
        params.insert(crate::params::PASSWORD, password);
    }
    params
}
