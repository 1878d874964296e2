//! Connection parameters shared by every driver.
//!
//! Keys are case-insensitive and folded through an alias table, so `server`,
//! `SERVER` and `host` all land on `host`. Keys this crate does not recognise
//! are kept verbatim and handed to the backend as session options.

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::DriverError;

pub const DRIVER: &str = "driver";
pub const HOST: &str = "host";
pub const PORT: &str = "port";
pub const DBNAME: &str = "dbname";
pub const USER: &str = "user";
pub const PASSWORD: &str = "password";
pub const INSTANCE_NAME: &str = "instance_name";
pub const PATH: &str = "path";
pub const MEMORY: &str = "memory";
pub const ENCRYPT: &str = "encrypt";
pub const TRUST_SERVER_CERTIFICATE: &str = "trust_server_certificate";
pub const APPLICATION_NAME: &str = "application_name";

const RECOGNIZED: &[&str] = &[
    DRIVER,
    HOST,
    PORT,
    DBNAME,
    USER,
    PASSWORD,
    INSTANCE_NAME,
    PATH,
    MEMORY,
    ENCRYPT,
    TRUST_SERVER_CERTIFICATE,
    APPLICATION_NAME,
];

lazy_static! {
    static ref SESSION_OPTION_NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex");
}

/// Lookup form of `key`: case-folded and resolved through the alias table.
fn canonical_key(key: &str) -> String {
    let lowered = key.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "server" | "servername" => HOST.to_string(),
        "database" => DBNAME.to_string(),
        "username" | "uid" => USER.to_string(),
        "pwd" => PASSWORD.to_string(),
        "instance" => INSTANCE_NAME.to_string(),
        _ => lowered,
    }
}

/// Spelling a key is stored and reported under. Recognised keys take their
/// canonical name; passthrough keys keep the caller's spelling.
fn stored_name(key: &str) -> String {
    let canonical = canonical_key(key);
    if RECOGNIZED.contains(&canonical.as_str()) {
        canonical
    } else {
        key.trim().to_string()
    }
}

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Flag(bool),
    Int(i64),
    Text(String),
}

impl ParamValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view; numeric text is accepted.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            ParamValue::Text(s) => s.trim().parse().ok(),
            ParamValue::Flag(_) => None,
        }
    }

    /// Flag view; `1/0`, `true/false`, `yes/no` and `on/off` are accepted.
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ParamValue::Flag(b) => Some(*b),
            ParamValue::Int(1) => Some(true),
            ParamValue::Int(0) => Some(false),
            ParamValue::Int(_) => None,
            ParamValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            },
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Flag(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

/// Option name to value map used to open a connection.
///
/// ```rust
/// use sql_driver::params::ConnectionParameters;
///
/// let params = ConnectionParameters::new()
///     .with("Server", "db.internal,1433")
///     .with("user", "app");
/// assert_eq!(params.host(), Some("db.internal,1433"));
/// assert_eq!(params.dbname(), None);
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ConnectionParameters {
    // keyed by canonical_key, holding the stored name alongside the value
    entries: BTreeMap<String, (String, ParamValue)>,
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.iter() {
            if name == PASSWORD {
                map.entry(&name, &"<redacted>");
            } else {
                map.entry(&name, value);
            }
        }
        map.finish()
    }
}

impl Serialize for ConnectionParameters {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for ConnectionParameters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = BTreeMap::<String, ParamValue>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

impl<K: AsRef<str>, V: Into<ParamValue>> FromIterator<(K, V)> for ConnectionParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = ConnectionParameters::new();
        for (key, value) in iter {
            params.insert(key.as_ref(), value);
        }
        params
    }
}

impl ConnectionParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse parameters from a JSON object.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` if the text is not a JSON object
    /// of strings, integers and booleans.
    pub fn from_json_str(json: &str) -> Result<Self, DriverError> {
        serde_json::from_str(json)
            .map_err(|e| DriverError::config(format!("invalid connection parameters: {e}")))
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.entries
            .insert(canonical_key(key), (stored_name(key), value.into()))
            .map(|(_, previous)| previous)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.entries
            .remove(&canonical_key(key))
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(&canonical_key(key)).map(|(_, value)| value)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    #[must_use]
    pub fn get_flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ParamValue::as_flag)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&canonical_key(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn driver(&self) -> Option<&str> {
        self.get_str(DRIVER)
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.get_str(HOST)
    }

    /// Database name. Empty strings count as absent.
    #[must_use]
    pub fn dbname(&self) -> Option<&str> {
        self.get_str(DBNAME).filter(|name| !name.trim().is_empty())
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.get_str(USER)
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.get_str(PASSWORD)
    }

    /// Explicit port.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` if the value is not a valid TCP port.
    pub fn port(&self) -> Result<Option<u16>, DriverError> {
        match self.get(PORT) {
            None => Ok(None),
            Some(value) => value
                .as_int()
                .and_then(|p| u16::try_from(p).ok())
                .filter(|p| *p != 0)
                .map(Some)
                .ok_or_else(|| DriverError::config(format!("invalid port: {value}"))),
        }
    }

    /// Normalized server address built from `host`, `port` and `instance_name`.
    ///
    /// Returns `None` when no host was supplied.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` if a port is malformed.
    pub fn server_address(&self) -> Result<Option<ServerAddress>, DriverError> {
        let Some(host) = self.host() else {
            return Ok(None);
        };
        let mut address = ServerAddress::parse(host)?;
        if let Some(port) = self.port()? {
            address.port = Some(port);
        }
        if let Some(instance) = self.get_str(INSTANCE_NAME) {
            address.instance_name = Some(instance.to_string());
        }
        Ok(Some(address))
    }

    /// Parameters not recognised by any driver, validated as session options.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` if a key is not a plain identifier.
    pub fn session_options(&self) -> Result<Vec<SessionOption>, DriverError> {
        self.entries
            .iter()
            .filter(|(key, _)| !RECOGNIZED.contains(&key.as_str()))
            .map(|(_, (key, value))| {
                if SESSION_OPTION_NAME.is_match(key) {
                    Ok(SessionOption {
                        name: key.clone(),
                        value: value.clone(),
                    })
                } else {
                    Err(DriverError::config(format!(
                        "unsupported connection option name: {key}"
                    )))
                }
            })
            .collect()
    }
}

/// A passthrough option applied to the native session after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOption {
    pub name: String,
    pub value: ParamValue,
}

/// Host, port and named instance of a network server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
}

impl ServerAddress {
    /// Parse `name`, `name,port`, `name:port` or `name\INSTANCE`.
    ///
    /// # Errors
    /// Returns `DriverError::ConnectionFailed` for an empty host or bad port.
    pub fn parse(raw: &str) -> Result<Self, DriverError> {
        let raw = raw.trim();
        let raw = raw.strip_prefix("tcp:").unwrap_or(raw);

        let (rest, port) = match raw.rsplit_once(',').or_else(|| {
            // a single colon is host:port; more than one is an IPv6 literal
            if raw.matches(':').count() == 1 {
                raw.rsplit_once(':')
            } else {
                None
            }
        }) {
            Some((host, port)) => {
                let port = port
                    .trim()
                    .parse::<u16>()
                    .ok()
                    .filter(|p| *p != 0)
                    .ok_or_else(|| DriverError::config(format!("invalid port in host: {raw}")))?;
                (host.trim(), Some(port))
            }
            None => (raw, None),
        };

        let (host, instance_name) = match rest.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => (host, Some(instance.to_string())),
            Some((host, _)) => (host, None),
            None => (rest, None),
        };

        if host.is_empty() {
            return Err(DriverError::config("host must not be empty"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            instance_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn keys_are_folded_through_aliases() {
        let params = ConnectionParameters::new()
            .with("SERVER", "localhost")
            .with("Database", "app")
            .with("UID", "sa")
            .with("PWD", "secret");
        assert_eq!(params.host(), Some("localhost"));
        assert_eq!(params.dbname(), Some("app"));
        assert_eq!(params.user(), Some("sa"));
        assert_eq!(params.password(), Some("secret"));
    }

    #[test]
    fn blank_dbname_is_absent() {
        let params = ConnectionParameters::new().with("dbname", "  ");
        assert_eq!(params.dbname(), None);
    }

    #[test]
    fn parses_server_address_forms() {
        let plain = ServerAddress::parse("db.local").unwrap();
        assert_eq!(plain.port, None);
        assert_eq!(plain.instance_name, None);

        let comma = ServerAddress::parse("tcp:db.local,1444").unwrap();
        assert_eq!(comma.host, "db.local");
        assert_eq!(comma.port, Some(1444));

        let colon = ServerAddress::parse("db.local:1555").unwrap();
        assert_eq!(colon.port, Some(1555));

        let named = ServerAddress::parse(r"db.local\SQLEXPRESS").unwrap();
        assert_eq!(named.host, "db.local");
        assert_eq!(named.instance_name.as_deref(), Some("SQLEXPRESS"));

        let ipv6 = ServerAddress::parse("::1").unwrap();
        assert_eq!(ipv6.host, "::1");
        assert_eq!(ipv6.port, None);
    }

    #[test]
    fn explicit_port_overrides_embedded_port() {
        let params = ConnectionParameters::new()
            .with("host", "db.local,1444")
            .with("port", "1500");
        let address = params.server_address().unwrap().unwrap();
        assert_eq!(address.port, Some(1500));
    }

    #[test]
    fn bad_port_is_a_connection_error() {
        let params = ConnectionParameters::new()
            .with("host", "db.local")
            .with("port", 70000);
        let err = params.server_address().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);

        assert!(ServerAddress::parse("db.local,abc").is_err());
        assert!(ServerAddress::parse(",1433").is_err());
    }

    #[test]
    fn unknown_keys_become_session_options() {
        let params = ConnectionParameters::new()
            .with("host", "db")
            .with("busy_timeout", 5000)
            .with("LOCK_TIMEOUT", "100");
        let options = params.session_options().unwrap();
        let names: Vec<_> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["busy_timeout", "LOCK_TIMEOUT"]);
        assert_eq!(params.get("lock_timeout"), Some(&ParamValue::from("100")));
    }

    #[test]
    fn debug_output_hides_the_password() {
        let params = ConnectionParameters::new()
            .with("user", "sa")
            .with("PWD", "hunter2");
        let rendered = format!("{params:?}");
        assert!(rendered.contains("\"user\": Text(\"sa\")"), "{rendered}");
        assert!(rendered.contains("password"), "{rendered}");
        assert!(!rendered.contains("hunter2"), "{rendered}");
    }

    #[test]
    fn rejects_option_names_that_are_not_identifiers() {
        let params = ConnectionParameters::new().with("x; DROP TABLE t", 1);
        assert!(params.session_options().is_err());
    }

    #[test]
    fn loads_from_json() {
        let params = ConnectionParameters::from_json_str(
            r#"{"driver":"sqlite","memory":true,"cache_size":-2000,"Database":"main"}"#,
        )
        .unwrap();
        assert_eq!(params.driver(), Some("sqlite"));
        assert_eq!(params.get_flag("memory"), Some(true));
        assert_eq!(params.get("cache_size"), Some(&ParamValue::Int(-2000)));
        assert_eq!(params.dbname(), Some("main"));

        assert!(ConnectionParameters::from_json_str("[1,2]").is_err());
    }

    #[test]
    fn flag_views_accept_common_spellings() {
        assert_eq!(ParamValue::from("yes").as_flag(), Some(true));
        assert_eq!(ParamValue::from("OFF").as_flag(), Some(false));
        assert_eq!(ParamValue::Int(2).as_flag(), None);
    }
}
