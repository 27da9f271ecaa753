//! clickhouse-harness: connection bootstrap and test harness for ClickHouse
//!
//! The crate does two small things well:
//!
//! * assemble a connection descriptor from a [`ClientConfig`] and open an
//!   instrumented handle through a registered [`connection::Driver`]
//! * wait for a freshly provisioned server to become reachable, using a bounded
//!   exponential backoff health check ([`wait_for`])
//!
//! Query execution and the native protocol itself are left to the driver.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> clickhouse_harness::Result<()> {
//! use clickhouse_harness::{wait_for, Client, ClientConfig, RetryPolicy};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = ClientConfig::builder()
//!     .server("localhost:9000")
//!     .server("replica:9000")
//!     .username("default")
//!     .build();
//!
//! let client = Client::connect(&config).await?;
//! let parent = CancellationToken::new();
//! wait_for(&parent, &RetryPolicy::default(), |ctx| {
//!     let client = &client;
//!     async move { client.ping(&ctx).await }
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod connection;
pub mod error;
pub mod harness;
pub mod health;
pub mod metrics;

pub use client::{build_descriptor, Client, ClientConfig, Descriptor};
pub use error::{Error, Result};
pub use health::{wait_for, wait_for_with, AttemptContext, RetryPolicy};
