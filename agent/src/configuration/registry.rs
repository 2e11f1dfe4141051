//! Option registry: binds options to the shared source list and drives reloads

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::error::{ConfigurationError, ConversionError};
use super::option::ConfigurationOption;
use super::source::ConfigurationSource;

/// Serializable view of one option, for admin and diagnostics surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDescriptor {
    pub key: String,
    pub label: String,
    pub description: String,
    pub plugin_name: String,
    pub dynamic: bool,
    pub value_type: &'static str,
    pub default_value: String,
    pub value: String,
    pub name_of_current_configuration_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Type-erased handle the registry keeps for every option
trait ManagedOption: Send + Sync {
    fn is_dynamic(&self) -> bool;
    fn reload(&self);
    fn validate(&self, value: &str) -> Result<(), ConversionError>;
    fn descriptor(&self) -> OptionDescriptor;
}

impl<T> ManagedOption for ConfigurationOption<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn is_dynamic(&self) -> bool {
        ConfigurationOption::is_dynamic(self)
    }

    fn reload(&self) {
        ConfigurationOption::reload(self)
    }

    fn validate(&self, value: &str) -> Result<(), ConversionError> {
        ConfigurationOption::validate(self, value)
    }

    fn descriptor(&self) -> OptionDescriptor {
        let resolved = self.resolved();
        OptionDescriptor {
            key: self.key().to_string(),
            label: self.label().to_string(),
            description: self.description().to_string(),
            plugin_name: self.plugin_name().to_string(),
            dynamic: ConfigurationOption::is_dynamic(self),
            value_type: self.value_type(),
            default_value: self.default_value_as_string().to_string(),
            value: resolved.value_as_string().to_string(),
            name_of_current_configuration_source: resolved.source_name().to_string(),
            error_message: resolved.error_message().map(str::to_string),
        }
    }
}

/// Ordered configuration sources plus every option resolved against them
pub struct Configuration {
    sources: Vec<Arc<dyn ConfigurationSource>>,
    options: RwLock<BTreeMap<String, Arc<dyn ManagedOption>>>,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("Configuration")
            .field("sources", &sources)
            .field("options", &self.options.read().len())
            .finish()
    }
}

impl Configuration {
    /// `sources` in precedence order: the first source defining a key wins
    pub fn new(sources: Vec<Arc<dyn ConfigurationSource>>) -> Self {
        Self {
            sources,
            options: RwLock::new(BTreeMap::new()),
        }
    }

    /// Bind `option` to the sources, resolve it and keep it for reloads.
    ///
    /// Keys are unique across the registry.
    pub fn register<T>(
        &self,
        option: ConfigurationOption<T>,
    ) -> Result<Arc<ConfigurationOption<T>>, ConfigurationError>
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut options = self.options.write();
        if options.contains_key(option.key()) {
            return Err(ConfigurationError::DuplicateKey(option.key().to_string()));
        }

        option.bind(self.sources.clone())?;
        let option = Arc::new(option);
        options.insert(
            option.key().to_string(),
            Arc::clone(&option) as Arc<dyn ManagedOption>,
        );
        Ok(option)
    }

    /// Refresh every source, then re-resolve every dynamic option
    pub fn reload_dynamic_options(&self) {
        for source in &self.sources {
            source.reload();
        }

        let options: Vec<Arc<dyn ManagedOption>> = self.options.read().values().cloned().collect();
        let mut reloaded = 0usize;
        for option in options.iter().filter(|o| o.is_dynamic()) {
            option.reload();
            reloaded += 1;
        }
        tracing::debug!(options = reloaded, "Reloaded dynamic configuration options");
    }

    /// Check `value` against the converter of the option registered as `key`
    pub fn validate(&self, key: &str, value: &str) -> Result<(), ConfigurationError> {
        let option = self
            .options
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownKey(key.to_string()))?;
        option.validate(value)?;
        Ok(())
    }

    /// Descriptors of all registered options, ordered by key
    pub fn describe(&self) -> Vec<OptionDescriptor> {
        self.options.read().values().map(|o| o.descriptor()).collect()
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Reload dynamic options every `interval` until shutdown is signalled
    pub fn start_reload_task(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately; options were resolved at registration
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        // A dropped sender counts as shutdown
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => self.reload_dynamic_options(),
                }
            }
            tracing::debug!("Configuration reload task shutdown complete");
        })
    }
}
