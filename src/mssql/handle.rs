use lazy_static::lazy_static;
use regex::Regex;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::client::{MssqlClient, create_mssql_client};
use super::config::MssqlOptions;
use super::params::bind_query_params;
use super::query::build_result_set;
use crate::connection::quote;
use crate::native::{NativeExecution, NativeHandle, Platform};
use crate::params::ParamValue;
use crate::results::ResultSet;
use crate::translation::{PlaceholderStyle, translate_placeholders};
use crate::translator::{DiagnosticRecord, NativeFailure, NativeResult};
use crate::types::{DatabaseType, RowValues};

static PLATFORM: Platform = Platform {
    placeholders: PlaceholderStyle::Mssql,
    identity_sql: "SELECT CONVERT(VARCHAR(40), @@IDENTITY)",
    sequence_sql: "SELECT CONVERT(VARCHAR(MAX), current_value) FROM sys.sequences WHERE name = ?",
    server_version_sql: Some("SELECT CAST(SERVERPROPERTY('ProductVersion') AS NVARCHAR(128))"),
    current_database_sql: Some("SELECT DB_NAME()"),
};

const STRICT_WARNINGS: &str = "SET ANSI_WARNINGS ON; SET ARITHABORT ON";

lazy_static! {
    static ref BARE_SET_VALUE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").expect("static regex");
}

/// One tiberius client, driven to completion on a private current-thread
/// runtime for every call.
///
/// SET statements and transaction control go out as plain batches so their
/// effect outlives the statement; everything else is sent as a parameterised
/// RPC.
pub struct MssqlHandle {
    // dropped before the runtime it was created on
    client: Option<MssqlClient>,
    runtime: Runtime,
}

impl std::fmt::Debug for MssqlHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlHandle")
            .field("open", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl MssqlHandle {
    /// Start the runtime and log in.
    ///
    /// # Errors
    /// Returns the native failure if the runtime cannot start, the server is
    /// unreachable or login is refused.
    pub fn open(options: &MssqlOptions) -> NativeResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                NativeFailure::single(DiagnosticRecord::message(format!(
                    "failed to start the SQL Server runtime: {e}"
                )))
            })?;
        debug!(
            server = %options.server,
            port = ?options.port,
            instance = ?options.instance_name,
            "connecting to sql server"
        );
        let client = runtime.block_on(create_mssql_client(
            options.tiberius_config(),
            options.instance_name.is_some(),
        ))?;
        Ok(Self {
            client: Some(client),
            runtime,
        })
    }

    fn parts(&mut self) -> NativeResult<(&Runtime, &mut MssqlClient)> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| NativeFailure::message("sql server connection is closed"))?;
        Ok((&self.runtime, client))
    }

    /// Send `sql` as a plain batch and discard whatever it returns.
    fn batch(&mut self, sql: &str) -> NativeResult<()> {
        let (runtime, client) = self.parts()?;
        runtime.block_on(async {
            client.simple_query(sql).await?.into_results().await?;
            Ok::<_, tiberius::error::Error>(())
        })?;
        Ok(())
    }
}

fn set_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Flag(true) => "ON".to_string(),
        ParamValue::Flag(false) => "OFF".to_string(),
        ParamValue::Int(i) => i.to_string(),
        ParamValue::Text(s) if BARE_SET_VALUE.is_match(s) => s.clone(),
        ParamValue::Text(s) => quote(s),
    }
}

impl NativeHandle for MssqlHandle {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mssql
    }

    fn platform(&self) -> &'static Platform {
        &PLATFORM
    }

    fn configure_strict(&mut self) -> NativeResult<()> {
        self.batch(STRICT_WARNINGS)
    }

    fn apply_session_option(&mut self, name: &str, value: &ParamValue) -> NativeResult<()> {
        let sql = format!("SET {} {}", name.to_ascii_uppercase(), set_value(value));
        self.batch(&sql)
    }

    fn execute(&mut self, sql: &str, params: &[RowValues]) -> NativeResult<NativeExecution> {
        let sql = translate_placeholders(sql, PLATFORM.placeholders);
        let (runtime, client) = self.parts()?;
        let result = runtime.block_on(bind_query_params(&sql, params).execute(client))?;
        Ok(NativeExecution::affected(result.total()))
    }

    fn query(&mut self, sql: &str, params: &[RowValues]) -> NativeResult<ResultSet> {
        let sql = translate_placeholders(sql, PLATFORM.placeholders);
        let (runtime, client) = self.parts()?;
        Ok(runtime.block_on(build_result_set(client, &sql, params))?)
    }

    fn last_generated_id(&mut self) -> NativeResult<Option<String>> {
        let (runtime, client) = self.parts()?;
        let row = runtime.block_on(async {
            client
                .simple_query(PLATFORM.identity_sql)
                .await?
                .into_row()
                .await
        })?;
        Ok(row.and_then(|row| row.try_get::<&str, _>(0).ok().flatten().map(str::to_string)))
    }

    fn begin(&mut self) -> NativeResult<()> {
        self.batch("BEGIN TRANSACTION")
    }

    fn commit(&mut self) -> NativeResult<()> {
        self.batch("COMMIT TRANSACTION")
    }

    fn rollback(&mut self) -> NativeResult<()> {
        self.batch("ROLLBACK TRANSACTION")
    }

    fn in_transaction(&mut self) -> NativeResult<bool> {
        let (runtime, client) = self.parts()?;
        let row = runtime.block_on(async {
            client
                .simple_query("SELECT @@TRANCOUNT")
                .await?
                .into_row()
                .await
        })?;
        Ok(row
            .and_then(|row| row.try_get::<i32, _>(0).ok().flatten())
            .is_some_and(|count| count > 0))
    }

    fn server_version(&mut self) -> NativeResult<Option<String>> {
        Ok(None)
    }

    fn close(&mut self) -> NativeResult<()> {
        if let Some(client) = self.client.take() {
            debug!("closing sql server connection");
            self.runtime.block_on(client.close())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_values_render_as_sql_server_expects() {
        assert_eq!(set_value(&ParamValue::Flag(true)), "ON");
        assert_eq!(set_value(&ParamValue::Flag(false)), "OFF");
        assert_eq!(set_value(&ParamValue::Int(5000)), "5000");
        assert_eq!(set_value(&ParamValue::Text("ymd".into())), "ymd");
        assert_eq!(set_value(&ParamValue::Text("O'Hare".into())), "'O''Hare'");
    }

    #[test]
    fn identity_lookups_are_session_scoped() {
        assert!(PLATFORM.identity_sql.contains("@@IDENTITY"));
        assert!(PLATFORM.server_version_sql.is_some());
    }
}
