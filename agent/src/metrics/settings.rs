//! Configuration the export pipeline consumes

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::configuration::{Configuration, ConfigurationError, ConfigurationOption};
use crate::core::constants::{
    CORE_PLUGIN_NAME, DEFAULT_REPORTING_INTERVAL_SECS, KEY_ACTIVE, KEY_APPLICATION_NAME,
    KEY_ELASTICSEARCH_URL, KEY_INSTANCE_NAME, KEY_ONLY_LOG_METRIC_REPORTS, KEY_REPORTING_INTERVAL,
};

/// Settings read by the reporter at the start of every cycle
pub trait ReporterSettings: Send + Sync {
    /// Master switch; an inactive agent reports nothing
    fn is_active(&self) -> bool;

    /// Log payloads instead of sending them to the store
    fn only_log_reports(&self) -> bool;

    /// Store base URL without trailing slash
    fn store_url(&self) -> String;

    /// Tags added to every exported document
    fn global_tags(&self) -> BTreeMap<String, String>;
}

/// The core options, registered in a [`Configuration`]
#[derive(Debug)]
pub struct CoreOptions {
    active: Arc<ConfigurationOption<bool>>,
    only_log_reports: Arc<ConfigurationOption<bool>>,
    elasticsearch_url: Arc<ConfigurationOption<String>>,
    reporting_interval: Arc<ConfigurationOption<i32>>,
    application_name: Arc<ConfigurationOption<String>>,
    instance_name: Arc<ConfigurationOption<String>>,
    extra_tags: BTreeMap<String, String>,
}

impl CoreOptions {
    pub fn register(config: &Configuration) -> Result<Self, ConfigurationError> {
        let active = config.register(
            ConfigurationOption::boolean_option()
                .key(KEY_ACTIVE)
                .label("Activate monitoring")
                .description("If set to 'false' no metrics are collected or reported.")
                .plugin_name(CORE_PLUGIN_NAME)
                .dynamic(true)
                .default_value(true)
                .build()?,
        )?;

        let only_log_reports = config.register(
            ConfigurationOption::boolean_option()
                .key(KEY_ONLY_LOG_METRIC_REPORTS)
                .label("Only log metric reports")
                .description(
                    "Write bulk payloads to the ElasticsearchMetrics log instead of \
                     sending them to the metrics store.",
                )
                .plugin_name(CORE_PLUGIN_NAME)
                .dynamic(true)
                .default_value(false)
                .build()?,
        )?;

        let elasticsearch_url = config.register(
            ConfigurationOption::string_option()
                .key(KEY_ELASTICSEARCH_URL)
                .label("Elasticsearch URL")
                .description("Base URL of the metrics store, e.g. http://localhost:9200")
                .plugin_name(CORE_PLUGIN_NAME)
                .dynamic(true)
                .default_value(String::new())
                .build()?,
        )?;

        let reporting_interval = config.register(
            ConfigurationOption::integer_option()
                .key(KEY_REPORTING_INTERVAL)
                .label("Reporting interval Elasticsearch")
                .description("Seconds between two metric reports.")
                .plugin_name(CORE_PLUGIN_NAME)
                .default_value(DEFAULT_REPORTING_INTERVAL_SECS)
                .build()?,
        )?;

        let application_name = config.register(
            ConfigurationOption::string_option()
                .key(KEY_APPLICATION_NAME)
                .label("Name of the application")
                .description("Exported as the 'application' tag of every metric.")
                .plugin_name(CORE_PLUGIN_NAME)
                .default_value(String::new())
                .build()?,
        )?;

        let instance_name = config.register(
            ConfigurationOption::string_option()
                .key(KEY_INSTANCE_NAME)
                .label("Instance name")
                .description("Exported as the 'instance' tag of every metric.")
                .plugin_name(CORE_PLUGIN_NAME)
                .default_value(String::new())
                .build()?,
        )?;

        Ok(Self {
            active,
            only_log_reports,
            elasticsearch_url,
            reporting_interval,
            application_name,
            instance_name,
            extra_tags: BTreeMap::new(),
        })
    }

    /// Add a host-provided global tag; overrides the configured ones
    pub fn with_global_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_tags.insert(key.into(), value.into());
        self
    }

    /// Reporting period, at least one second
    pub fn reporting_interval(&self) -> Duration {
        Duration::from_secs(self.reporting_interval.value().max(1) as u64)
    }
}

impl ReporterSettings for CoreOptions {
    fn is_active(&self) -> bool {
        self.active.value()
    }

    fn only_log_reports(&self) -> bool {
        self.only_log_reports.value()
    }

    fn store_url(&self) -> String {
        self.elasticsearch_url
            .value()
            .trim_end_matches('/')
            .to_string()
    }

    fn global_tags(&self) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        let application = self.application_name.value();
        if !application.is_empty() {
            tags.insert("application".to_string(), application);
        }
        let instance = self.instance_name.value();
        if !instance.is_empty() {
            tags.insert("instance".to_string(), instance);
        }
        tags.extend(self.extra_tags.clone());
        tags
    }
}
