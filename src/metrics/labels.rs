//! Metric names and label values

/// Driver handle opens
pub const DRIVER_OPENS_TOTAL: &str = "clickhouse_harness_driver_opens_total";
/// Driver pings
pub const DRIVER_PINGS_TOTAL: &str = "clickhouse_harness_driver_pings_total";
/// Health-check attempts
pub const HEALTH_CHECK_ATTEMPTS_TOTAL: &str = "clickhouse_harness_health_check_attempts_total";
/// Health checks that ran out of attempts
pub const HEALTH_CHECK_EXHAUSTED_TOTAL: &str = "clickhouse_harness_health_check_exhausted_total";

/// Open duration in milliseconds
pub const DRIVER_OPEN_DURATION_MS: &str = "clickhouse_harness_driver_open_duration_ms";
/// Ping duration in milliseconds
pub const DRIVER_PING_DURATION_MS: &str = "clickhouse_harness_driver_ping_duration_ms";
/// Attempts used by a finished health check
pub const HEALTH_CHECK_ATTEMPTS_USED: &str = "clickhouse_harness_health_check_attempts_used";

/// `outcome` label for successful operations
pub const OUTCOME_SUCCESS: &str = "success";
/// `outcome` label for failed operations
pub const OUTCOME_FAILURE: &str = "failure";
