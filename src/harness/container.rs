//! Container provisioning seam

use crate::health::{wait_for, RetryPolicy};
use crate::{Error, Result};
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

/// What to start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerRequest {
    /// Image reference
    pub image: String,
    /// Exposed container ports (`<port>/tcp`); the first one is probed and mapped
    pub exposed_ports: Vec<String>,
    /// Environment variables
    pub env: BTreeMap<String, String>,
    /// Command override; empty keeps the image default
    pub cmd: Vec<String>,
}

impl ContainerRequest {
    /// Request for `image` with nothing exposed
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    /// Expose a port; bare numbers get a `/tcp` suffix
    pub fn expose(mut self, port: &str) -> Self {
        self.exposed_ports.push(tcp_port(port));
        self
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Override the command
    pub fn cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(Into::into).collect();
        self
    }
}

pub(crate) fn tcp_port(port: &str) -> String {
    if port.contains('/') {
        port.to_string()
    } else {
        format!("{}/tcp", port)
    }
}

/// A started container
pub trait Container: Send + Sync {
    /// Runtime identifier
    fn id(&self) -> &str;

    /// Host the mapped ports are reachable on
    fn host(&self) -> BoxFuture<'_, Result<String>>;

    /// Host port mapped to container `port` (`<port>/tcp`)
    fn mapped_port<'a>(&'a self, port: &'a str) -> BoxFuture<'a, Result<u16>>;

    /// Stop and remove the container
    fn terminate(&self) -> BoxFuture<'_, Result<()>>;
}

/// Starts containers
pub trait ContainerRuntime: Send + Sync {
    /// Start a container and return once the runtime reports it running
    fn start<'a>(
        &'a self,
        request: &'a ContainerRequest,
    ) -> BoxFuture<'a, Result<Box<dyn Container>>>;
}

/// Running container with its resolved address
pub struct TestContainer {
    container: Box<dyn Container>,
    addr: String,
}

impl std::fmt::Debug for TestContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContainer")
            .field("id", &self.container.id())
            .field("addr", &self.addr)
            .finish()
    }
}

impl TestContainer {
    /// `host:port` of the first exposed port
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Underlying container
    pub fn container(&self) -> &dyn Container {
        self.container.as_ref()
    }

    /// Stop and remove the container
    pub async fn terminate(self) -> Result<()> {
        self.container.terminate().await
    }
}

/// Policy for waiting until the first exposed port accepts connections
pub fn listening_port_policy() -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(250), Duration::from_secs(5), 30)
        .unwrap_or_default()
}

/// Start a container and resolve the address of its first exposed port
///
/// Waits until that port accepts TCP connections. The container is
/// terminated again if any step after starting it fails.
pub async fn ensure_container(
    runtime: &dyn ContainerRuntime,
    request: ContainerRequest,
) -> Result<TestContainer> {
    ensure_container_with(runtime, request, &listening_port_policy()).await
}

/// [`ensure_container`] with an explicit policy for the listening-port wait
pub async fn ensure_container_with(
    runtime: &dyn ContainerRuntime,
    request: ContainerRequest,
    policy: &RetryPolicy,
) -> Result<TestContainer> {
    let port = request
        .exposed_ports
        .first()
        .cloned()
        .ok_or_else(|| Error::Config("no ports to expose".into()))?;

    let container = runtime.start(&request).await?;
    tracing::info!(id = container.id(), image = %request.image, "container started");

    match resolve_addr(container.as_ref(), &port, policy).await {
        Ok(addr) => Ok(TestContainer { container, addr }),
        Err(e) => {
            if let Err(term) = container.terminate().await {
                tracing::warn!(id = container.id(), error = %term, "terminate after failed start");
            }
            Err(e)
        }
    }
}

async fn resolve_addr(
    container: &dyn Container,
    port: &str,
    policy: &RetryPolicy,
) -> Result<String> {
    let host = container.host().await?;
    let mapped = container.mapped_port(port).await?;
    let addr = format!("{}:{}", host, mapped);

    let parent = CancellationToken::new();
    wait_for(&parent, policy, |ctx| {
        let addr = addr.as_str();
        async move {
            ctx.run(async {
                TcpStream::connect(addr)
                    .await
                    .map(drop)
                    .map_err(|e| Error::Container(format!("port {} not listening: {}", addr, e)))
            })
            .await
        }
    })
    .await?;

    Ok(addr)
}
