//! Driver plumbing
//!
//! This module handles:
//! * Driver and handle traits
//! * Named driver registration
//! * Instrumentation wrappers (tracing spans, metrics)
//! * The built-in TCP driver and its handle state machine

mod driver;
mod instrument;
mod registry;
mod state;
mod transport;

pub use driver::{Driver, Handle};
pub use instrument::{instrumented_name, register_instrumented, InstrumentedDriver, InstrumentedHandle};
pub use registry::{DriverRegistry, DEFAULT_DRIVER};
pub use state::HandleState;
pub use transport::{parse_duration, TcpDriver, TcpHandle, DEFAULT_DIAL_TIMEOUT};
