//! Metrics for driver and health-check activity
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! application installs a recorder.

pub mod counters;
pub mod histograms;
pub mod labels;
