//! Convenient imports for common functionality.

pub use crate::connection::{Connection, quote};
pub use crate::driver::{Driver, connect, driver_for};
pub use crate::error::{DriverError, ErrorKind};
pub use crate::params::{ConnectionParameters, ParamValue};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::statement::{Statement, StatementState};
pub use crate::transaction::TransactionState;
pub use crate::translator::{NormalizedError, Operation};
pub use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteDriver, SqliteOptions, SqliteOptionsBuilder};

#[cfg(feature = "mssql")]
pub use crate::mssql::{MssqlDriver, MssqlOptions, MssqlOptionsBuilder};
