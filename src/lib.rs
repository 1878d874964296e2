//! A uniform, synchronous driver layer over relational backends.
//!
//! Every backend plugs in as a [`native::NativeHandle`]; callers only ever
//! see [`Connection`], [`Statement`] and [`DriverError`].
//!
//! ```rust,no_run
//! use sql_driver::prelude::*;
//!
//! # fn main() -> Result<(), DriverError> {
//! let params = ConnectionParameters::new().with("driver", "sqlite");
//! let conn = sql_driver::connect(&params)?;
//! conn.exec("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")?;
//! let mut stmt = conn.prepare("INSERT INTO t (name) VALUES (?)")?;
//! stmt.execute_with(&[RowValues::Text("O'Brien".into())])?;
//! assert_eq!(conn.last_insert_id(None)?, "1");
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod driver;
pub mod error;
pub mod native;
pub mod params;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod transaction;
pub mod translation;
pub mod translator;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use connection::{Connection, LastInsertId, quote};
pub use driver::{Driver, connect, driver_for};
pub use error::{DriverError, ErrorKind};
pub use params::{ConnectionParameters, ParamValue};
pub use results::{CustomDbRow, ResultSet};
pub use statement::{Rows, Statement, StatementKind, StatementState};
pub use transaction::TransactionState;
pub use translator::{DiagnosticRecord, NativeFailure, NormalizedError, Operation};
pub use types::{DatabaseType, RowValues};
