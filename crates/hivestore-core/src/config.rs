//! Catalog configuration: a string-keyed property map and the typed
//! connection settings parsed from it.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::backend::DEFAULT_KEYSPACE;
use crate::error::ConfigError;

pub const CONF_HOST: &str = "connection.host";
pub const CONF_PORT: &str = "connection.port";
pub const CONF_FRAMED: &str = "connection.framed";
pub const CONF_RANDOMIZE_CONNECTIONS: &str = "connection.randomizeConnections";
pub const CONF_TIMEOUT_MILLIS: &str = "connection.timeoutMillis";
pub const CONF_KEYSPACE: &str = "catalog.keyspace";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 9160;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Property map handed to the catalog at configure time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    props: BTreeMap<String, String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.set(key, value.to_string())
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.set(key, value.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(invalid(key, v, "expected true or false")),
            },
        }
    }

    pub fn get_parsed<T: std::str::FromStr>(
        &self,
        key: &str,
        default: T,
        reason: &str,
    ) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.trim().parse().map_err(|_| invalid(key, v, reason)),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            props: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn invalid(option: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Candidate hosts, tried in order.
    pub hosts: Vec<String>,
    pub port: u16,
    pub framed: bool,
    pub randomize_connections: bool,
    pub timeout: Duration,
    pub keyspace: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            hosts: vec![DEFAULT_HOST.to_string()],
            port: DEFAULT_PORT,
            framed: false,
            randomize_connections: false,
            timeout: DEFAULT_TIMEOUT,
            keyspace: DEFAULT_KEYSPACE.to_string(),
        }
    }
}

impl ConnectionConfig {
    pub fn from_conf(conf: &Configuration) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let hosts = match conf.get(CONF_HOST) {
            None => defaults.hosts,
            Some(raw) => {
                let hosts: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect();
                if hosts.is_empty() {
                    return Err(invalid(CONF_HOST, raw, "at least one host is required"));
                }
                hosts
            }
        };

        let port = conf.get_parsed(CONF_PORT, defaults.port, "expected a port number")?;
        if port == 0 {
            return Err(invalid(CONF_PORT, "0", "port must be non-zero"));
        }

        let timeout_ms: u64 = conf.get_parsed(
            CONF_TIMEOUT_MILLIS,
            defaults.timeout.as_millis() as u64,
            "expected milliseconds",
        )?;

        let keyspace = match conf.get(CONF_KEYSPACE) {
            None => defaults.keyspace,
            Some(ks) if !ks.trim().is_empty() => ks.trim().to_string(),
            Some(ks) => return Err(invalid(CONF_KEYSPACE, ks, "keyspace must not be empty")),
        };

        Ok(Self {
            hosts,
            port,
            framed: conf.get_bool(CONF_FRAMED, defaults.framed)?,
            randomize_connections: conf
                .get_bool(CONF_RANDOMIZE_CONNECTIONS, defaults.randomize_connections)?,
            timeout: Duration::from_millis(timeout_ms),
            keyspace,
        })
    }

    /// `host:port` strings in candidate order.
    pub fn endpoints(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|h| format!("{h}:{}", self.port))
            .collect()
    }
}
