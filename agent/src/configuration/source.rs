//! Configuration sources
//!
//! A source is a named provider of raw configuration strings. Sources carry
//! no ordering of their own; precedence is the order in which they are
//! handed to [`super::Configuration`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::Value as JsonValue;

use crate::core::constants::ENVIRONMENT_SOURCE_NAME;

/// Named provider of raw configuration values
pub trait ConfigurationSource: Send + Sync {
    /// Name shown in diagnostics and option descriptors
    fn name(&self) -> &str;

    /// Raw value for `key`, or `None` if this source does not define it
    fn get(&self, key: &str) -> Option<String>;

    /// Refresh cached content before dynamic options are re-resolved
    fn reload(&self) {}
}

// =============================================================================
// In-memory source
// =============================================================================

/// In-memory source whose values can be changed at runtime
#[derive(Debug, Default)]
pub struct SimpleSource {
    name: String,
    values: RwLock<HashMap<String, String>>,
}

impl SimpleSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Builder-style insert
    pub fn with(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }
}

impl ConfigurationSource for SimpleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

// =============================================================================
// Environment source
// =============================================================================

/// Process environment; `a.b.c` is looked up as `A_B_C` (with optional prefix)
#[derive(Debug, Default)]
pub struct EnvironmentSource {
    prefix: Option<String>,
}

impl EnvironmentSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    /// Prepend `prefix` to every variable name, e.g. `MYAPP_`
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn variable_name(&self, key: &str) -> String {
        let name = key.replace(['.', '-'], "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, name),
            None => name,
        }
    }
}

impl ConfigurationSource for EnvironmentSource {
    fn name(&self) -> &str {
        ENVIRONMENT_SOURCE_NAME
    }

    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

// =============================================================================
// JSON file source
// =============================================================================

/// Flat JSON object file, e.g. `{"stagemonitor.active": true}`.
///
/// Strings, numbers and booleans are exposed as strings; nested values are
/// ignored. `reload()` re-reads the file and keeps the previous values if
/// the file cannot be read or parsed.
#[derive(Debug)]
pub struct JsonFileSource {
    name: String,
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl JsonFileSource {
    /// Open a file source; a missing or invalid file starts out empty
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let source = Self {
            name: path.display().to_string(),
            path,
            values: RwLock::new(HashMap::new()),
        };
        source.reload();
        source
    }

    fn load(path: &Path) -> Result<HashMap<String, String>, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let root: serde_json::Map<String, JsonValue> =
            serde_json::from_str(&content).map_err(|e| e.to_string())?;

        Ok(root
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    JsonValue::String(s) => s,
                    JsonValue::Number(n) => n.to_string(),
                    JsonValue::Bool(b) => b.to_string(),
                    _ => {
                        tracing::debug!(key = %key, "Ignoring non-scalar configuration value");
                        return None;
                    }
                };
                Some((key, value))
            })
            .collect())
    }
}

impl ConfigurationSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn reload(&self) {
        match Self::load(&self.path) {
            Ok(values) => {
                tracing::debug!(
                    path = %self.path.display(),
                    entries = values.len(),
                    "Loaded configuration file"
                );
                *self.values.write() = values;
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to load configuration file, keeping previous values"
                );
            }
        }
    }
}
