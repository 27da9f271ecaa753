//! Connection descriptor assembly and parsing
//!
//! Format:
//! * clickhouse://primary-host:port?username=u&password=p[&alt_hosts=h2:p2,h3:p3][&opt=v...]
//!
//! Option order is fixed: `username`, `password`, `alt_hosts` (only with more
//! than one server), then caller options in the order given. Values are not
//! escaped; callers must keep `&`, `?` and `=` out of credentials and options.

use super::config::ClientConfig;
use crate::{Error, Result};

/// Descriptor scheme
pub const SCHEME: &str = "clickhouse";

const SCHEME_PREFIX: &str = "clickhouse://";

/// Build a connection descriptor from configuration
///
/// Fails with [`Error::Config`] when no servers are configured.
///
/// # Examples
///
/// ```
/// use clickhouse_harness::{build_descriptor, ClientConfig};
///
/// let config = ClientConfig::builder()
///     .servers(["a:1", "b:2", "c:3"])
///     .username("u")
///     .password("p")
///     .option("dial_timeout=5s")
///     .build();
///
/// let descriptor = build_descriptor(&config).unwrap();
/// assert_eq!(
///     descriptor,
///     "clickhouse://a:1?username=u&password=p&alt_hosts=b:2,c:3&dial_timeout=5s"
/// );
/// ```
pub fn build_descriptor(config: &ClientConfig) -> Result<String> {
    let (primary, alternates) = config
        .servers
        .split_first()
        .ok_or_else(|| Error::Config("no servers provided".into()))?;

    let mut options = Vec::with_capacity(3 + config.options.len());
    options.push(format!("username={}", config.username));
    options.push(format!("password={}", config.password));
    if !alternates.is_empty() {
        options.push(format!("alt_hosts={}", alternates.join(",")));
    }
    options.extend(config.options.iter().cloned());

    Ok(format!("{}{}?{}", SCHEME_PREFIX, primary, options.join("&")))
}

/// Replace the password value of a descriptor with `***`
///
/// Passwords are not escaped and may contain `&`, so the value is taken to run
/// from `password=` up to the `alt_hosts` term the builder emits right after
/// it. Without alternates everything after `password=` is hidden, caller
/// options included. Strings without a `password=` term are returned
/// unchanged.
pub fn redact(descriptor: &str) -> String {
    let Some((base, query)) = descriptor.split_once('?') else {
        return descriptor.to_string();
    };

    let start = if query.starts_with("password=") {
        Some(0)
    } else {
        query.find("&password=").map(|pos| pos + 1)
    };
    let Some(start) = start else {
        return descriptor.to_string();
    };

    let value = start + "password=".len();
    let rest = query[value..]
        .rfind("&alt_hosts=")
        .map(|pos| &query[value + pos..])
        .unwrap_or_default();

    format!("{}?{}password=***{}", base, &query[..start], rest)
}

/// Parsed connection descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Primary host (`host:port`)
    pub primary: String,
    /// Alternate hosts, in failover order
    pub alt_hosts: Vec<String>,
    /// Every query term in order, including `username`, `password` and `alt_hosts`
    pub options: Vec<(String, String)>,
}

impl Descriptor {
    /// Parse a descriptor string
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s.strip_prefix(SCHEME_PREFIX).ok_or_else(|| {
            Error::Config(format!("descriptor must start with {}", SCHEME_PREFIX))
        })?;

        let (primary, query) = rest.split_once('?').unwrap_or((rest, ""));
        if primary.is_empty() {
            return Err(Error::Config("descriptor has no primary host".into()));
        }

        let options: Vec<(String, String)> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect();

        let alt_hosts = options
            .iter()
            .find(|(k, _)| k == "alt_hosts")
            .map(|(_, v)| {
                v.split(',')
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            primary: primary.to_string(),
            alt_hosts,
            options,
        })
    }

    /// Look up an option value; the first occurrence wins
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Primary host followed by alternates
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.alt_hosts.iter().map(String::as_str))
    }
}
