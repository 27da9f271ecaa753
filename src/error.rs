//! Error types for clickhouse-harness

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (empty server list, malformed descriptor, bad policy)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Driver could not be registered or instrumented
    #[error("registering driver for instrumentation: {0}")]
    DriverRegistration(String),

    /// Opening or using a database handle failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Caller-supplied probe reported a failure
    #[error("probe failed: {0}")]
    Probe(String),

    /// Attempt deadline elapsed
    #[error("deadline exceeded after {0:?}")]
    Timeout(Duration),

    /// Attempt was cancelled through its parent token
    #[error("operation cancelled")]
    Cancelled,

    /// Container runtime failure
    #[error("container error: {0}")]
    Container(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Static label used for metrics
    pub fn category(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::DriverRegistration(_) => "driver_registration",
            Error::Connection(_) => "connection",
            Error::Probe(_) => "probe",
            Error::Timeout(_) => "timeout",
            Error::Cancelled => "cancelled",
            Error::Container(_) => "container",
            Error::Io(_) => "io",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
