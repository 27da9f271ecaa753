//! Instrumentation wrappers for registered drivers
//!
//! [`register_instrumented`] wraps an existing driver so every open and ping
//! runs inside a `tracing` span and is counted through the `metrics` facade.
//! Descriptors are logged with the password redacted.

use super::driver::{Driver, Handle};
use super::registry::DriverRegistry;
use crate::client::descriptor::redact;
use crate::health::AttemptContext;
use crate::metrics::labels::{OUTCOME_FAILURE, OUTCOME_SUCCESS};
use crate::{Error, Result};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Name an instrumented wrapper of `base` is registered under
pub fn instrumented_name(base: &str) -> String {
    format!("instrumented-{}", base)
}

/// Register an instrumented wrapper of the driver named `base`
///
/// Returns the wrapper's name. Calling this again for the same base returns the
/// existing wrapper's name. Fails with [`Error::DriverRegistration`] when
/// `base` is not registered.
pub fn register_instrumented(registry: &DriverRegistry, base: &str) -> Result<String> {
    let name = instrumented_name(base);
    if registry.contains(&name) {
        return Ok(name);
    }

    let inner = registry.get(base).ok_or_else(|| {
        Error::DriverRegistration(format!("unknown driver '{}'", base))
    })?;

    match registry.register(&name, Arc::new(InstrumentedDriver::new(base, inner))) {
        Ok(()) => Ok(name),
        // lost a race with another registration of the same wrapper
        Err(Error::DriverRegistration(_)) if registry.contains(&name) => Ok(name),
        Err(e) => Err(e),
    }
}

/// Driver wrapper recording spans and metrics
pub struct InstrumentedDriver {
    name: String,
    inner: Arc<dyn Driver>,
}

impl InstrumentedDriver {
    /// Wrap `inner`; `name` labels spans and metrics
    pub fn new(name: impl Into<String>, inner: Arc<dyn Driver>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }
}

impl Driver for InstrumentedDriver {
    fn open<'a>(&'a self, descriptor: &'a str) -> BoxFuture<'a, Result<Box<dyn Handle>>> {
        let span = tracing::info_span!(
            "driver_open",
            driver = %self.name,
            descriptor = %redact(descriptor)
        );

        Box::pin(
            async move {
                let start = Instant::now();
                let result = self.inner.open(descriptor).await;
                crate::metrics::histograms::driver_open_duration(
                    &self.name,
                    start.elapsed().as_millis() as u64,
                );

                match result {
                    Ok(handle) => {
                        crate::metrics::counters::driver_open(&self.name, OUTCOME_SUCCESS);
                        tracing::info!(peer = handle.peer(), "handle opened");
                        Ok(Box::new(InstrumentedHandle {
                            driver: self.name.clone(),
                            inner: handle,
                        }) as Box<dyn Handle>)
                    }
                    Err(e) => {
                        crate::metrics::counters::driver_open(&self.name, OUTCOME_FAILURE);
                        tracing::warn!(error = %e, "open failed");
                        Err(e)
                    }
                }
            }
            .instrument(span),
        )
    }
}

/// Handle wrapper recording spans and metrics
pub struct InstrumentedHandle {
    driver: String,
    inner: Box<dyn Handle>,
}

impl Handle for InstrumentedHandle {
    fn peer(&self) -> &str {
        self.inner.peer()
    }

    fn ping<'a>(&'a self, ctx: &'a AttemptContext) -> BoxFuture<'a, Result<()>> {
        let span = tracing::debug_span!(
            "driver_ping",
            driver = %self.driver,
            peer = self.inner.peer(),
            attempt = ctx.attempt()
        );

        Box::pin(
            async move {
                let start = Instant::now();
                let result = self.inner.ping(ctx).await;
                crate::metrics::histograms::driver_ping_duration(
                    &self.driver,
                    start.elapsed().as_millis() as u64,
                );
                let outcome = if result.is_ok() {
                    OUTCOME_SUCCESS
                } else {
                    OUTCOME_FAILURE
                };
                crate::metrics::counters::driver_ping(&self.driver, outcome);
                result
            }
            .instrument(span),
        )
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            tracing::debug!(driver = %self.driver, peer = self.inner.peer(), "closing handle");
            self.inner.close().await
        })
    }
}
