//! Client configuration

use serde::{Deserialize, Serialize};
use std::env;

/// Environment variable holding the comma-separated server list
pub const ENV_SERVERS: &str = "CLICKHOUSE_SERVERS";
/// Environment variable holding the username
pub const ENV_USERNAME: &str = "CLICKHOUSE_USERNAME";
/// Environment variable holding the password
pub const ENV_PASSWORD: &str = "CLICKHOUSE_PASSWORD";
/// Environment variable holding `&`-separated driver options
pub const ENV_OPTIONS: &str = "CLICKHOUSE_OPTIONS";

/// Connection configuration
///
/// `servers[0]` is the primary host, every later entry is offered to the
/// driver as an alternate. `options` are raw `key=value` strings passed
/// through verbatim, in order.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Ordered `host:port` list
    pub servers: Vec<String>,
    /// Username
    pub username: String,
    /// Password
    pub password: String,
    /// Extra driver options (`key=value`)
    pub options: Vec<String>,
}

impl ClientConfig {
    /// Create a configuration for a single server with empty credentials
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            servers: vec![server.into()],
            ..Self::default()
        }
    }

    /// Create a builder
    ///
    /// # Examples
    ///
    /// ```
    /// use clickhouse_harness::ClientConfig;
    ///
    /// let config = ClientConfig::builder()
    ///     .server("ch-1:9000")
    ///     .server("ch-2:9000")
    ///     .username("default")
    ///     .password("secret")
    ///     .option("dial_timeout=5s")
    ///     .build();
    /// assert_eq!(config.servers.len(), 2);
    /// ```
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from `CLICKHOUSE_*` environment variables
    ///
    /// Unset variables yield empty values. An empty server list is not an
    /// error here; it is reported when the descriptor is built.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let servers = lookup(ENV_SERVERS)
            .map(|v| split_non_empty(&v, ','))
            .unwrap_or_default();
        let options = lookup(ENV_OPTIONS)
            .map(|v| split_non_empty(&v, '&'))
            .unwrap_or_default();

        Self {
            servers,
            username: lookup(ENV_USERNAME).unwrap_or_default(),
            password: lookup(ENV_PASSWORD).unwrap_or_default(),
            options,
        }
    }
}

fn split_non_empty(value: &str, sep: char) -> Vec<String> {
    value
        .split(sep)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("servers", &self.servers)
            .field("username", &self.username)
            .field("password", &"***")
            .field("options", &self.options)
            .finish()
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Append a server; the first one added is the primary
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.config.servers.push(server.into());
        self
    }

    /// Append several servers, preserving their order
    pub fn servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config
            .servers
            .extend(servers.into_iter().map(Into::into));
        self
    }

    /// Set the username
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    /// Append a raw `key=value` driver option
    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.config.options.push(option.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
