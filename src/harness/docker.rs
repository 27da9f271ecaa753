//! Container runtime backed by testcontainers on the local Docker daemon

use super::container::{Container, ContainerRequest, ContainerRuntime};
use crate::{Error, Result};
use futures::future::BoxFuture;
use testcontainers::core::ContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ContainerRequest as ImageRequest, GenericImage, ImageExt};
use tokio::sync::Mutex;

/// Starts containers through `testcontainers`
///
/// Daemon discovery (`DOCKER_HOST`, contexts, TLS) is left to testcontainers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerRuntime;

impl DockerRuntime {
    /// Runtime for the daemon testcontainers resolves from the environment
    pub fn new() -> Self {
        Self
    }
}

/// Split `repo[:tag]` into name and tag; a missing tag means `latest`
pub(crate) fn split_image(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.is_empty() && !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}

/// Parse `<port>[/tcp|/udp|/sctp]`
pub(crate) fn parse_port(port: &str) -> Result<ContainerPort> {
    let (number, protocol) = port.split_once('/').unwrap_or((port, "tcp"));
    let number: u16 = number
        .parse()
        .map_err(|_| Error::Config(format!("invalid container port '{}'", port)))?;

    match protocol {
        "tcp" => Ok(ContainerPort::Tcp(number)),
        "udp" => Ok(ContainerPort::Udp(number)),
        "sctp" => Ok(ContainerPort::Sctp(number)),
        other => Err(Error::Config(format!(
            "unsupported protocol '{}' for port {}",
            other, number
        ))),
    }
}

pub(crate) fn image_request(request: &ContainerRequest) -> Result<ImageRequest<GenericImage>> {
    let (name, tag) = split_image(&request.image);
    let mut image = GenericImage::new(name, tag);
    for port in &request.exposed_ports {
        image = image.with_exposed_port(parse_port(port)?);
    }

    let mut image_request: ImageRequest<GenericImage> = image.into();
    for (key, value) in &request.env {
        image_request = image_request.with_env_var(key.clone(), value.clone());
    }
    if !request.cmd.is_empty() {
        image_request = image_request.with_cmd(request.cmd.clone());
    }
    Ok(image_request)
}

impl ContainerRuntime for DockerRuntime {
    fn start<'a>(
        &'a self,
        request: &'a ContainerRequest,
    ) -> BoxFuture<'a, Result<Box<dyn Container>>> {
        Box::pin(async move {
            let container = image_request(request)?
                .start()
                .await
                .map_err(|e| Error::Container(format!("starting {}: {}", request.image, e)))?;

            Ok(Box::new(DockerContainer {
                id: container.id().to_string(),
                inner: Mutex::new(Some(container)),
            }) as Box<dyn Container>)
        })
    }
}

/// Container started by [`DockerRuntime`]
pub struct DockerContainer {
    id: String,
    inner: Mutex<Option<ContainerAsync<GenericImage>>>,
}

impl std::fmt::Debug for DockerContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerContainer")
            .field("id", &self.id)
            .finish()
    }
}

impl DockerContainer {
    fn terminated(&self) -> Error {
        Error::Container(format!("container {} was terminated", self.id))
    }
}

impl Container for DockerContainer {
    fn id(&self) -> &str {
        &self.id
    }

    fn host(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let inner = self.inner.lock().await;
            let container = inner.as_ref().ok_or_else(|| self.terminated())?;
            let host = container
                .get_host()
                .await
                .map_err(|e| Error::Container(format!("resolving host of {}: {}", self.id, e)))?;
            Ok(host.to_string())
        })
    }

    fn mapped_port<'a>(&'a self, port: &'a str) -> BoxFuture<'a, Result<u16>> {
        Box::pin(async move {
            let port = parse_port(port)?;
            let inner = self.inner.lock().await;
            let container = inner.as_ref().ok_or_else(|| self.terminated())?;
            container
                .get_host_port_ipv4(port)
                .await
                .map_err(|e| Error::Container(format!("port {:?} of {}: {}", port, self.id, e)))
        })
    }

    fn terminate(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let Some(container) = self.inner.lock().await.take() else {
                return Ok(());
            };
            container
                .rm()
                .await
                .map_err(|e| Error::Container(format!("removing {}: {}", self.id, e)))?;
            tracing::info!(id = %self.id, "container terminated");
            Ok(())
        })
    }
}
