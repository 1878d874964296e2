// SQLite module - the rusqlite backend
//
// Sub-modules:
// - config: options resolved from connection parameters, and opening the file
// - handle: the native handle wrapping one rusqlite connection
// - params: parameter conversion between driver and SQLite values
// - query: result extraction and building
// - error: mapping rusqlite failures to diagnostic records
// - driver: the `Driver` implementation

pub mod config;
pub mod driver;
mod error;
pub mod handle;
pub mod params;
pub mod query;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use driver::SqliteDriver;
pub use handle::SqliteHandle;
pub use query::build_result_set;
