//! Readiness checks
//!
//! This module handles:
//! * Per-attempt bounded contexts
//! * Retry policy and backoff schedule
//! * The `wait_for` loop that polls a caller-supplied probe

mod context;
mod policy;
mod wait;

pub use context::AttemptContext;
pub use policy::{
    RetryPolicy, Schedule, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF,
};
pub use wait::{wait_for, wait_for_with};
