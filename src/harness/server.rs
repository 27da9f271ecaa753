//! Ephemeral ClickHouse servers for integration tests

use super::container::{ensure_container, ContainerRequest, ContainerRuntime, TestContainer};
use crate::client::{Client, ClientConfig};
use crate::connection::DriverRegistry;
use crate::health::{
    wait_for, RetryPolicy, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF,
};
use crate::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Image used on arm64 hosts
pub const IMAGE_ARM64: &str = "altinity/clickhouse-server:21.12.3.32.altinitydev.arm";
/// Image used everywhere else
pub const IMAGE_X86_64: &str = "altinity/clickhouse-server:21.8.10.1.altinitystable";
/// Native protocol port
pub const NATIVE_PORT: &str = "9000";

/// Health-check attempt budget
pub const HEALTH_CHECK_RETRIES: u32 = DEFAULT_MAX_ATTEMPTS;
/// First health-check timeout
pub const HEALTH_CHECK_INITIAL_BACKOFF: Duration = DEFAULT_INITIAL_BACKOFF;
/// Health-check timeout cap
pub const HEALTH_CHECK_MAX_BACKOFF: Duration = DEFAULT_MAX_BACKOFF;

/// Image for a `std::env::consts::ARCH` value
pub fn image_for_arch(arch: &str) -> &'static str {
    match arch {
        "aarch64" | "arm64" => IMAGE_ARM64,
        _ => IMAGE_X86_64,
    }
}

/// Image for the current host
pub fn default_image() -> &'static str {
    image_for_arch(std::env::consts::ARCH)
}

/// Start a ClickHouse container exposing the native port
pub async fn create_container(runtime: &dyn ContainerRuntime) -> Result<TestContainer> {
    ensure_container(runtime, ContainerRequest::new(default_image()).expose(NATIVE_PORT)).await
}

/// Running server plus a client that passed its health check
#[derive(Debug)]
pub struct TestServer {
    client: Client,
    container: TestContainer,
}

impl TestServer {
    /// Connected client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Server address
    pub fn addr(&self) -> &str {
        self.container.addr()
    }

    /// Close the client, then terminate the container
    ///
    /// Both steps always run; the first error is returned.
    pub async fn shutdown(self) -> Result<()> {
        let closed = self.client.close().await;
        let terminated = self.container.terminate().await;
        closed.and(terminated)
    }
}

/// Start a server, connect to it and wait until it answers pings
///
/// With the built-in `clickhouse` driver a ping is a TCP dial, so this only
/// proves the native port accepts connections.
pub async fn create_client_and_server(runtime: &dyn ContainerRuntime) -> Result<TestServer> {
    let container = create_container(runtime).await?;
    connect_and_wait(container, DriverRegistry::global(), &RetryPolicy::default()).await
}

/// Connect to an already running container and wait for it to become healthy
///
/// The container is terminated if connecting or the health check fails.
pub async fn connect_and_wait(
    container: TestContainer,
    registry: &DriverRegistry,
    policy: &RetryPolicy,
) -> Result<TestServer> {
    let config = ClientConfig::new(container.addr());
    let client = match Client::connect_with(&config, registry).await {
        Ok(client) => client,
        Err(e) => {
            discard(None, container).await;
            return Err(e);
        }
    };

    let parent = CancellationToken::new();
    let healthy = wait_for(&parent, policy, |ctx| {
        let client = &client;
        async move { client.ping(&ctx).await }
    })
    .await;

    match healthy {
        Ok(()) => Ok(TestServer { client, container }),
        Err(e) => {
            tracing::error!(addr = container.addr(), error = %e, "ClickHouse server unhealthy");
            discard(Some(client), container).await;
            Err(e)
        }
    }
}

async fn discard(client: Option<Client>, container: TestContainer) {
    if let Some(client) = client {
        if let Err(e) = client.close().await {
            tracing::debug!(error = %e, "close during cleanup failed");
        }
    }
    if let Err(e) = container.terminate().await {
        tracing::warn!(error = %e, "terminate during cleanup failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::container::ensure_container_with;
    use crate::harness::container::tests::{fast_policy, LocalRuntime};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_image_for_arch() {
        assert_eq!(image_for_arch("aarch64"), IMAGE_ARM64);
        assert_eq!(image_for_arch("x86_64"), IMAGE_X86_64);
        assert_eq!(image_for_arch("riscv64"), IMAGE_X86_64);
    }

    #[test]
    fn test_health_check_defaults() {
        assert_eq!(HEALTH_CHECK_RETRIES, 10);
        assert_eq!(HEALTH_CHECK_INITIAL_BACKOFF, Duration::from_secs(1));
        assert_eq!(HEALTH_CHECK_MAX_BACKOFF, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_connect_and_wait_then_shutdown() {
        let terminated = Arc::new(AtomicBool::new(false));
        let runtime = LocalRuntime {
            listen: true,
            terminated: terminated.clone(),
        };
        let container = ensure_container_with(
            &runtime,
            ContainerRequest::new("img").expose(NATIVE_PORT),
            &fast_policy(),
        )
        .await
        .unwrap();

        let registry = DriverRegistry::with_defaults();
        let server = connect_and_wait(container, &registry, &fast_policy())
            .await
            .unwrap();
        assert_eq!(server.client().peer(), server.addr());

        server.shutdown().await.unwrap();
        assert!(terminated.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_connect_terminates_container() {
        let terminated = Arc::new(AtomicBool::new(false));
        let runtime = LocalRuntime {
            listen: true,
            terminated: terminated.clone(),
        };
        let container = ensure_container_with(
            &runtime,
            ContainerRequest::new("img").expose(NATIVE_PORT),
            &fast_policy(),
        )
        .await
        .unwrap();

        // no drivers registered, so instrumentation setup fails
        let registry = DriverRegistry::new();
        let err = connect_and_wait(container, &registry, &fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::DriverRegistration(_)));
        assert!(terminated.load(Ordering::SeqCst));
    }
}
