//! Typed configuration options
//!
//! A [`ConfigurationOption`] is a single named cell that resolves its value
//! against an ordered list of [`ConfigurationSource`]s. The resolved state is
//! published as one immutable [`ResolvedValue`] record, so readers never
//! block and never observe a value paired with another resolution's string
//! or source name.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use regex::Regex;

use super::converter::{
    BooleanConverter, IntegerConverter, LongConverter, RegexListConverter, RegexMap,
    RegexMapConverter, StringConverter, StringsConverter, ValueConverter,
};
use super::error::{ConfigurationError, ConversionError};
use super::source::ConfigurationSource;
use crate::core::constants::DEFAULT_VALUE_SOURCE_NAME;

/// One resolution result: value, its string form, where it came from, and
/// the last conversion failure (if any)
#[derive(Debug, Clone)]
pub struct ResolvedValue<T> {
    value: T,
    value_as_string: String,
    source_name: String,
    error_message: Option<String>,
}

impl<T> ResolvedValue<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_as_string(&self) -> &str {
        &self.value_as_string
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// A named, typed configuration value
pub struct ConfigurationOption<T> {
    key: String,
    label: String,
    description: String,
    plugin_name: String,
    dynamic: bool,
    default_value: T,
    default_value_as_string: String,
    converter: Box<dyn ValueConverter<T>>,
    sources: OnceLock<Vec<Arc<dyn ConfigurationSource>>>,
    state: ArcSwap<ResolvedValue<T>>,
    reload_lock: Mutex<()>,
}

impl<T> fmt::Debug for ConfigurationOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load();
        f.debug_struct("ConfigurationOption")
            .field("key", &self.key)
            .field("dynamic", &self.dynamic)
            .field("value", &state.value_as_string)
            .field("source", &state.source_name)
            .finish()
    }
}

impl<T> ConfigurationOption<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start building an option that converts its value with `converter`
    pub fn builder(converter: impl ValueConverter<T> + 'static) -> ConfigurationOptionBuilder<T> {
        ConfigurationOptionBuilder::new(Box::new(converter))
    }

    /// Bind the ordered source list and perform the first resolution.
    ///
    /// Sources can be bound only once; later calls fail with
    /// [`ConfigurationError::AlreadyBound`] and leave the option untouched.
    pub fn bind(&self, sources: Vec<Arc<dyn ConfigurationSource>>) -> Result<(), ConfigurationError> {
        self.sources
            .set(sources)
            .map_err(|_| ConfigurationError::AlreadyBound(self.key.clone()))?;

        let _guard = self.reload_lock.lock();
        self.load_value();
        Ok(())
    }

    /// Re-resolve against the bound sources. No-op for non-dynamic options.
    pub fn reload(&self) {
        if !self.dynamic {
            return;
        }
        let _guard = self.reload_lock.lock();
        self.load_value();
    }

    /// Check that `candidate` converts, without touching the current value
    pub fn validate(&self, candidate: &str) -> Result<(), ConversionError> {
        self.converter.parse(candidate).map(|_| ())
    }

    fn load_value(&self) {
        let Some(sources) = self.sources.get() else {
            return;
        };
        let resolved = self.resolve(sources);
        tracing::trace!(
            key = %self.key,
            value = %resolved.value_as_string,
            source = %resolved.source_name,
            "Resolved configuration option"
        );
        self.state.store(Arc::new(resolved));
    }

    fn resolve(&self, sources: &[Arc<dyn ConfigurationSource>]) -> ResolvedValue<T> {
        let found = sources.iter().find_map(|source| {
            source
                .get(&self.key)
                .map(|raw| (source.name().to_string(), raw))
        });

        let Some((source_name, raw)) = found else {
            return self.default_resolution(None);
        };

        let trimmed = raw.trim();
        match self.converter.parse(trimmed) {
            Ok(value) => ResolvedValue {
                value,
                value_as_string: trimmed.to_string(),
                source_name,
                error_message: None,
            },
            Err(e) => {
                let message = format!("Error in {}: {}", source_name, e);
                tracing::warn!(
                    key = %self.key,
                    source = %source_name,
                    value = %trimmed,
                    error = %e,
                    default = %self.default_value_as_string,
                    "Invalid configuration value, default value will be applied"
                );
                self.default_resolution(Some(message))
            }
        }
    }

    fn default_resolution(&self, error_message: Option<String>) -> ResolvedValue<T> {
        ResolvedValue {
            value: self.default_value.clone(),
            value_as_string: self.default_value_as_string.clone(),
            source_name: DEFAULT_VALUE_SOURCE_NAME.to_string(),
            error_message,
        }
    }

    /// Current value
    pub fn value(&self) -> T {
        self.state.load().value.clone()
    }

    /// Current resolution record; all fields belong to the same resolution
    pub fn resolved(&self) -> Arc<ResolvedValue<T>> {
        self.state.load_full()
    }
}

impl<T> ConfigurationOption<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn default_value(&self) -> &T {
        &self.default_value
    }

    pub fn default_value_as_string(&self) -> &str {
        &self.default_value_as_string
    }

    pub fn value_as_string(&self) -> String {
        self.state.load().value_as_string.clone()
    }

    /// Name of the source that supplied the current value, or `"Default Value"`
    pub fn name_of_current_source(&self) -> String {
        self.state.load().source_name.clone()
    }

    /// Last conversion failure, kept even though the default was applied
    pub fn error_message(&self) -> Option<String> {
        self.state.load().error_message.clone()
    }

    pub fn value_type(&self) -> &'static str {
        self.converter.type_name()
    }
}

// =============================================================================
// Typed shortcuts
// =============================================================================

impl ConfigurationOption<String> {
    pub fn string_option() -> ConfigurationOptionBuilder<String> {
        Self::builder(StringConverter)
    }
}

impl ConfigurationOption<bool> {
    pub fn boolean_option() -> ConfigurationOptionBuilder<bool> {
        Self::builder(BooleanConverter)
    }
}

impl ConfigurationOption<i32> {
    pub fn integer_option() -> ConfigurationOptionBuilder<i32> {
        Self::builder(IntegerConverter)
    }
}

impl ConfigurationOption<i64> {
    pub fn long_option() -> ConfigurationOptionBuilder<i64> {
        Self::builder(LongConverter)
    }
}

impl ConfigurationOption<BTreeSet<String>> {
    pub fn strings_option() -> ConfigurationOptionBuilder<BTreeSet<String>> {
        Self::builder(StringsConverter::new()).default_value(BTreeSet::new())
    }

    pub fn lower_strings_option() -> ConfigurationOptionBuilder<BTreeSet<String>> {
        Self::builder(StringsConverter::lower_case()).default_value(BTreeSet::new())
    }
}

impl ConfigurationOption<Vec<Regex>> {
    pub fn regex_list_option() -> ConfigurationOptionBuilder<Vec<Regex>> {
        Self::builder(RegexListConverter).default_value(Vec::new())
    }
}

impl ConfigurationOption<RegexMap> {
    pub fn regex_map_option() -> ConfigurationOptionBuilder<RegexMap> {
        Self::builder(RegexMapConverter).default_value(Vec::new())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Fixes everything about an option except its resolved value
pub struct ConfigurationOptionBuilder<T> {
    converter: Box<dyn ValueConverter<T>>,
    key: Option<String>,
    label: Option<String>,
    description: String,
    default_value: Option<T>,
    plugin_name: String,
    dynamic: bool,
}

impl<T> ConfigurationOptionBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn new(converter: Box<dyn ValueConverter<T>>) -> Self {
        Self {
            converter,
            key: None,
            label: None,
            description: String::new(),
            default_value: None,
            plugin_name: String::new(),
            dynamic: false,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Display name; defaults to the key
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn default_value(mut self, default_value: T) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn plugin_name(mut self, plugin_name: impl Into<String>) -> Self {
        self.plugin_name = plugin_name.into();
        self
    }

    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Validate required fields and create the option in its unbound state
    pub fn build(self) -> Result<ConfigurationOption<T>, ConfigurationError> {
        let key = self
            .key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigurationError::MissingKey)?;
        let default_value = self
            .default_value
            .ok_or_else(|| ConfigurationError::MissingDefault(key.clone()))?;
        let default_value_as_string = self.converter.format(&default_value);

        let state = ArcSwap::from_pointee(ResolvedValue {
            value: default_value.clone(),
            value_as_string: default_value_as_string.clone(),
            source_name: DEFAULT_VALUE_SOURCE_NAME.to_string(),
            error_message: None,
        });

        Ok(ConfigurationOption {
            label: self.label.unwrap_or_else(|| key.clone()),
            key,
            description: self.description,
            plugin_name: self.plugin_name,
            dynamic: self.dynamic,
            default_value,
            default_value_as_string,
            converter: self.converter,
            sources: OnceLock::new(),
            state,
            reload_lock: Mutex::new(()),
        })
    }
}
