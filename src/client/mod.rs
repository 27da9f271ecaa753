//! Client bootstrap
//!
//! This module handles:
//! * Client configuration (builder, serde, environment)
//! * Descriptor assembly and parsing
//! * Opening an instrumented handle through a registered driver

mod ch_client;
mod config;
pub(crate) mod descriptor;

pub use ch_client::Client;
pub use config::{
    ClientConfig, ClientConfigBuilder, ENV_OPTIONS, ENV_PASSWORD, ENV_SERVERS, ENV_USERNAME,
};
pub use descriptor::{build_descriptor, redact, Descriptor, SCHEME};
