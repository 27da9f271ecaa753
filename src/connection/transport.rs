//! Built-in TCP driver
//!
//! Dials the primary host and then each alternate in order, keeping the first
//! connection that succeeds. Pings re-dial the selected peer.
//!
//! Nothing here speaks the ClickHouse native protocol. A successful ping only
//! means the peer accepts TCP connections; a server that listens but is not yet
//! able to answer queries still passes. Register a protocol-level [`Driver`]
//! under [`DEFAULT_DRIVER`](super::DEFAULT_DRIVER) when readiness matters.

use super::driver::{Driver, Handle};
use super::state::HandleState;
use crate::client::Descriptor;
use crate::health::AttemptContext;
use crate::{Error, Result};
use futures::future::BoxFuture;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Dial timeout used when the descriptor has no `dial_timeout` option
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Parse a duration option such as `500ms`, `5s`, `2m` or a bare number of seconds
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => value.split_at(pos),
        None => (value, "s"),
    };

    let amount: u64 = digits
        .parse()
        .map_err(|_| Error::Config(format!("invalid duration '{}'", value)))?;

    match unit {
        "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
        _ => Err(Error::Config(format!(
            "invalid duration unit in '{}': expected ms, s or m",
            value
        ))),
    }
}

async fn connect_tcp(addr: &str, timeout: Duration) -> Result<TcpStream> {
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(stream) => Ok(stream?),
        Err(_) => Err(Error::Timeout(timeout)),
    }
}

/// Driver that opens plain TCP handles
///
/// Reachability only: see the module docs for what a ping does not check.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDriver;

impl TcpDriver {
    /// Create the driver
    pub fn new() -> Self {
        Self
    }
}

impl Driver for TcpDriver {
    fn open<'a>(&'a self, descriptor: &'a str) -> BoxFuture<'a, Result<Box<dyn Handle>>> {
        Box::pin(async move {
            let descriptor = Descriptor::parse(descriptor)?;
            let dial_timeout = descriptor
                .option("dial_timeout")
                .map(parse_duration)
                .transpose()?
                .unwrap_or(DEFAULT_DIAL_TIMEOUT);

            let mut last_failure = None;
            for host in descriptor.hosts() {
                match TcpHandle::connect(host, dial_timeout).await {
                    Ok(handle) => return Ok(Box::new(handle) as Box<dyn Handle>),
                    Err(err) => {
                        tracing::debug!(host, error = %err, "dial failed");
                        last_failure = Some(format!("{}: {}", host, err));
                    }
                }
            }

            Err(Error::Connection(format!(
                "no reachable host ({})",
                last_failure.unwrap_or_else(|| "no hosts".into())
            )))
        })
    }
}

struct Inner {
    state: HandleState,
    stream: Option<TcpStream>,
}

/// Handle bound to one reachable host
pub struct TcpHandle {
    peer: String,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for TcpHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpHandle").field("peer", &self.peer).finish()
    }
}

impl TcpHandle {
    /// Unconnected handle for `addr`
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            peer: addr.into(),
            inner: Mutex::new(Inner {
                state: HandleState::Initial,
                stream: None,
            }),
        }
    }

    /// Dial `addr` within `timeout`
    pub async fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let handle = Self::new(addr);
        handle.dial(timeout).await?;
        Ok(handle)
    }

    /// Dial the peer within `timeout`
    ///
    /// The handle reports [`HandleState::Connecting`] while the dial is in
    /// flight. A failed dial leaves it closed; dialing twice is an error.
    pub async fn dial(&self, timeout: Duration) -> Result<()> {
        self.inner
            .lock()
            .await
            .state
            .transition(HandleState::Connecting)?;

        let dialed = connect_tcp(&self.peer, timeout).await;

        let mut inner = self.inner.lock().await;
        match dialed {
            Ok(stream) => {
                // a close during the dial wins
                inner.state.transition(HandleState::Open)?;
                inner.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                inner.state.transition(HandleState::Closed)?;
                Err(e)
            }
        }
    }

    /// Current state
    pub async fn state(&self) -> HandleState {
        self.inner.lock().await.state
    }
}

impl Handle for TcpHandle {
    fn peer(&self) -> &str {
        &self.peer
    }

    fn ping<'a>(&'a self, ctx: &'a AttemptContext) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !self.inner.lock().await.state.is_open() {
                return Err(Error::Connection(format!("handle to {} is closed", self.peer)));
            }

            let stream = ctx
                .run(async {
                    TcpStream::connect(self.peer.as_str())
                        .await
                        .map_err(|e| Error::Connection(format!("ping {}: {}", self.peer, e)))
                })
                .await?;

            let mut inner = self.inner.lock().await;
            // a close that raced with the dial wins
            if inner.state.is_open() {
                inner.stream = Some(stream);
            }
            Ok(())
        })
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let stream = {
                let mut inner = self.inner.lock().await;
                inner.state.transition(HandleState::Closed)?;
                inner.stream.take()
            };

            if let Some(mut stream) = stream {
                if let Err(e) = stream.shutdown().await {
                    tracing::debug!(peer = %self.peer, error = %e, "shutdown after close failed");
                }
            }
            Ok(())
        })
    }
}
