// =============================================================================
// Logging
// =============================================================================

/// Crate name used in the default log filter
pub const CRATE_NAME: &str = "monitor_core";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "MONITOR_LOG";

/// Tracing target that receives bulk payloads in log-only mode
pub const METRICS_LOG_TARGET: &str = "ElasticsearchMetrics";

// =============================================================================
// Configuration
// =============================================================================

/// Source name reported when no configuration source supplied a value
pub const DEFAULT_VALUE_SOURCE_NAME: &str = "Default Value";

/// Name of the process environment configuration source
pub const ENVIRONMENT_SOURCE_NAME: &str = "Environment Variables";

/// Default interval between dynamic configuration reloads
pub const DEFAULT_RELOAD_INTERVAL_SECS: u64 = 60;

// =============================================================================
// Configuration Keys - Core
// =============================================================================

/// Plugin name used for options owned by this crate
pub const CORE_PLUGIN_NAME: &str = "Core";

/// Master switch for monitoring
pub const KEY_ACTIVE: &str = "stagemonitor.active";

/// Route bulk payloads to the log instead of the metrics store
pub const KEY_ONLY_LOG_METRIC_REPORTS: &str =
    "stagemonitor.reporting.elasticsearch.onlyLogElasticsearchMetricReports";

/// Base URL of the metrics store
pub const KEY_ELASTICSEARCH_URL: &str = "stagemonitor.elasticsearch.url";

/// Reporting period in seconds
pub const KEY_REPORTING_INTERVAL: &str = "stagemonitor.reporting.interval.elasticsearch";

/// Application name, exported as the `application` global tag
pub const KEY_APPLICATION_NAME: &str = "stagemonitor.applicationName";

/// Instance name, exported as the `instance` global tag
pub const KEY_INSTANCE_NAME: &str = "stagemonitor.instanceName";

/// Default reporting period in seconds
pub const DEFAULT_REPORTING_INTERVAL_SECS: i32 = 60;

// =============================================================================
// Metrics Store
// =============================================================================

/// Prefix of the daily metrics index
pub const METRICS_INDEX_PREFIX: &str = "stagemonitor-metrics-";

/// Document type used in bulk action lines and the bulk URL
pub const METRICS_TYPE: &str = "metrics";

/// Date format appended to the index prefix (UTC)
pub const INDEX_DATE_FORMAT: &str = "%Y.%m.%d";

/// Name of the self-timing metric recorded for every completed cycle
pub const REPORTING_TIME_METRIC: &str = "reporting_time";

/// Reporter identity tag value of the self-timing metric
pub const REPORTER_NAME: &str = "elasticsearch";

/// Timeout of a store health check
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Default interval between store health checks
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 60;
