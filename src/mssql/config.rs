use tiberius::{AuthMethod, Config as TiberiusConfig, EncryptionLevel};

use crate::error::DriverError;
use crate::params::{
    APPLICATION_NAME, ConnectionParameters, ENCRYPT, ParamValue, TRUST_SERVER_CERTIFICATE,
};

pub const DEFAULT_PORT: u16 = 1433;

/// Options for opening a SQL Server connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MssqlOptions {
    pub server: String,
    /// `None` logs in to the login's default database.
    pub database: Option<String>,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
    pub application_name: Option<String>,
    /// `None` keeps the client default.
    pub encrypt: Option<bool>,
    pub trust_server_certificate: bool,
}

impl MssqlOptions {
    #[must_use]
    pub fn new(server: String, user: String, password: String) -> Self {
        Self {
            server,
            database: None,
            user,
            password,
            port: None,
            instance_name: None,
            application_name: None,
            encrypt: None,
            trust_server_certificate: false,
        }
    }

    #[must_use]
    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_instance_name(mut self, instance_name: Option<String>) -> Self {
        self.instance_name = instance_name;
        self
    }

    /// Resolve options from connection parameters.
    ///
    /// `host` may carry the port and instance (`db,1444`, `db\SQLEXPRESS`);
    /// explicit `port` and `instance_name` keys override them.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` if `host` or `user` is missing,
    /// the port is invalid, or a flag is not a boolean.
    pub fn from_parameters(params: &ConnectionParameters) -> Result<Self, DriverError> {
        let address = params
            .server_address()?
            .ok_or_else(|| DriverError::config("host is required for SQL Server"))?;
        let user = params
            .user()
            .ok_or_else(|| DriverError::config("user is required for SQL Server authentication"))?;

        Ok(Self {
            server: address.host,
            database: params.dbname().map(str::to_string),
            user: user.to_string(),
            password: params.password().unwrap_or_default().to_string(),
            port: address.port,
            instance_name: address.instance_name,
            application_name: params.get_str(APPLICATION_NAME).map(str::to_string),
            encrypt: flag(params, ENCRYPT)?,
            trust_server_certificate: flag(params, TRUST_SERVER_CERTIFICATE)?.unwrap_or(false),
        })
    }

    /// Build the tiberius configuration for these options.
    #[must_use]
    pub fn tiberius_config(&self) -> TiberiusConfig {
        let mut config = TiberiusConfig::new();
        config.host(&self.server);
        config.port(self.port.unwrap_or(DEFAULT_PORT));
        if let Some(database) = &self.database {
            config.database(database);
        }
        config.authentication(AuthMethod::sql_server(&self.user, &self.password));
        if let Some(instance) = &self.instance_name {
            config.instance_name(instance);
        }
        if let Some(application_name) = &self.application_name {
            config.application_name(application_name);
        }
        match self.encrypt {
            Some(true) => config.encryption(EncryptionLevel::Required),
            Some(false) => config.encryption(EncryptionLevel::Off),
            None => {}
        }
        if self.trust_server_certificate {
            config.trust_cert();
        }
        config
    }
}

fn flag(params: &ConnectionParameters, key: &str) -> Result<Option<bool>, DriverError> {
    params
        .get(key)
        .map(|value: &ParamValue| {
            value
                .as_flag()
                .ok_or_else(|| DriverError::config(format!("{key} must be a boolean, got {value}")))
        })
        .transpose()
}

/// Fluent builder for MSSQL options.
#[derive(Debug, Clone)]
pub struct MssqlOptionsBuilder {
    opts: MssqlOptions,
}

impl MssqlOptionsBuilder {
    #[must_use]
    pub fn new(server: String, user: String, password: String) -> Self {
        Self {
            opts: MssqlOptions::new(server, user, password),
        }
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.opts.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.opts.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn application_name(mut self, application_name: impl Into<String>) -> Self {
        self.opts.application_name = Some(application_name.into());
        self
    }

    #[must_use]
    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.opts.encrypt = Some(encrypt);
        self
    }

    #[must_use]
    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.opts.trust_server_certificate = trust;
        self
    }

    #[must_use]
    pub fn finish(self) -> MssqlOptions {
        self.opts
    }
}
