//! Client implementation

use super::config::ClientConfig;
use super::descriptor::build_descriptor;
use crate::connection::{register_instrumented, DriverRegistry, Handle, DEFAULT_DRIVER};
use crate::health::AttemptContext;
use crate::{Error, Result};
use std::time::Duration;
use tracing::Instrument;

/// ClickHouse client handle
///
/// Owns an instrumented handle opened through a [`DriverRegistry`]. Query
/// execution belongs to the concrete driver; this type covers the bootstrap:
/// connecting, liveness pings and closing.
pub struct Client {
    driver: String,
    handle: Box<dyn Handle>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("driver", &self.driver)
            .field("peer", &self.handle.peer())
            .finish()
    }
}

impl Client {
    /// Connect through the process-wide registry's `clickhouse` driver
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # async fn example() -> clickhouse_harness::Result<()> {
    /// use clickhouse_harness::{Client, ClientConfig};
    ///
    /// let client = Client::connect(&ClientConfig::new("localhost:9000")).await?;
    /// client.ping_timeout(std::time::Duration::from_secs(1)).await?;
    /// client.close().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        Self::connect_with(config, DriverRegistry::global()).await
    }

    /// Connect through `registry`'s `clickhouse` driver
    pub async fn connect_with(config: &ClientConfig, registry: &DriverRegistry) -> Result<Self> {
        Self::connect_driver(config, registry, DEFAULT_DRIVER).await
    }

    /// Connect through the driver registered as `base` in `registry`
    ///
    /// Errors surface in order: [`Error::Config`] when the descriptor cannot
    /// be built, [`Error::DriverRegistration`] when instrumentation cannot be
    /// set up, then whatever the driver reports while opening.
    pub async fn connect_driver(
        config: &ClientConfig,
        registry: &DriverRegistry,
        base: &str,
    ) -> Result<Self> {
        let descriptor = build_descriptor(config)?;

        async {
            let driver_name = register_instrumented(registry, base)?;
            let driver = registry.get(&driver_name).ok_or_else(|| {
                Error::DriverRegistration(format!("driver '{}' vanished", driver_name))
            })?;

            let handle = driver.open(&descriptor).await?;
            Ok::<_, Error>(Self {
                driver: driver_name,
                handle,
            })
        }
        .instrument(tracing::info_span!(
            "connect",
            driver = base,
            servers = config.servers.len()
        ))
        .await
    }

    /// Name of the instrumented driver in use
    pub fn driver_name(&self) -> &str {
        &self.driver
    }

    /// Server the handle is bound to
    pub fn peer(&self) -> &str {
        self.handle.peer()
    }

    /// Liveness check bounded by `ctx`
    pub async fn ping(&self, ctx: &AttemptContext) -> Result<()> {
        self.handle.ping(ctx).await
    }

    /// Liveness check with a standalone timeout
    pub async fn ping_timeout(&self, timeout: Duration) -> Result<()> {
        let ctx = AttemptContext::with_timeout(timeout);
        self.handle.ping(&ctx).await
    }

    /// Close the handle
    pub async fn close(self) -> Result<()> {
        self.handle.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_empty_servers_fails_before_driver() {
        // an empty registry would fail registration; config must be checked first
        let registry = DriverRegistry::new();
        let err = Client::connect_with(&ClientConfig::default(), &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_missing_driver_is_registration_error() {
        let registry = DriverRegistry::new();
        let err = Client::connect_with(&ClientConfig::new("127.0.0.1:1"), &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DriverRegistration(_)));
    }

    #[tokio::test]
    async fn test_connect_ping_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let registry = DriverRegistry::with_defaults();

        let config = ClientConfig::builder()
            .server(addr.clone())
            .username("default")
            .option("dial_timeout=2s")
            .build();
        let client = Client::connect_with(&config, &registry).await.unwrap();
        assert_eq!(client.driver_name(), "instrumented-clickhouse");
        assert_eq!(client.peer(), addr);

        client.ping_timeout(Duration::from_secs(1)).await.unwrap();
        client.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let registry = DriverRegistry::with_defaults();
        let config = ClientConfig::builder()
            .server(addr)
            .option("dial_timeout=1s")
            .build();
        let err = Client::connect_with(&config, &registry).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }
}
