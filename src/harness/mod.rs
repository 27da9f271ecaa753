//! Integration-test harness
//!
//! This module handles:
//! * Container provisioning through a pluggable runtime (testcontainers built in)
//! * Waiting for a container port to listen
//! * Starting a ClickHouse server and a health-checked client for it
//!
//! Tests that use it need a container runtime and are usually `#[ignore]`d.

mod container;
mod docker;
mod server;

pub use container::{
    ensure_container, ensure_container_with, listening_port_policy, Container, ContainerRequest,
    ContainerRuntime, TestContainer,
};
pub use docker::{DockerContainer, DockerRuntime};
pub use server::{
    connect_and_wait, create_client_and_server, create_container, default_image, image_for_arch,
    TestServer, HEALTH_CHECK_INITIAL_BACKOFF, HEALTH_CHECK_MAX_BACKOFF, HEALTH_CHECK_RETRIES,
    IMAGE_ARM64, IMAGE_X86_64, NATIVE_PORT,
};

/// Install a test-friendly `tracing` subscriber honouring `RUST_LOG`
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
