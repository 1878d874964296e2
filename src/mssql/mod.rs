// SQL Server module - the tiberius backend
//
// Sub-modules:
// - config: options resolved from connection parameters, and the tiberius config
// - client: opening a TCP stream and logging in
// - handle: the native handle driving one client on a private runtime
// - params: binding driver values to tiberius queries
// - query: result extraction and building
// - error: mapping tiberius failures to diagnostic records
// - driver: the `Driver` implementation

pub mod client;
pub mod config;
pub mod driver;
mod error;
pub mod handle;
pub mod params;
pub mod query;

pub use client::MssqlClient;
pub use config::{MssqlOptions, MssqlOptionsBuilder};
pub use driver::MssqlDriver;
pub use handle::MssqlHandle;
pub use params::bind_query_params;
pub use query::build_result_set;
