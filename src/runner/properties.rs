//! Build property store
//!
//! Properties are write-once: the first definition wins, later attempts are
//! ignored. Command-line definitions are therefore loaded before anything
//! from the build file.

use crate::error::{ConfigError, ConfigResult, InterpolationResult};
use crate::runner::interpolate::expand;
use std::collections::HashMap;
use std::env;
use std::path::Path;

/// Property store shared by the steps of a build
#[derive(Debug, Clone, Default)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Check whether a property is defined
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set a property, replacing any previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Set a property unless it is already defined
    ///
    /// Returns `true` when the value was stored.
    pub fn set_new(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.values.contains_key(&name) {
            log::debug!("Override ignored for property \"{}\"", name);
            return false;
        }
        self.values.insert(name, value.into());
        true
    }

    /// Expand `${name}` references against the current values
    pub fn expand(&self, text: &str) -> InterpolationResult<String> {
        expand(text, &self.values)
    }

    /// Number of defined properties
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no property is defined
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over names and values, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort();
        entries.into_iter()
    }

    /// Import the process environment with `prefix.` in front of every name
    pub fn import_environment(&mut self, prefix: &str) {
        let prefix = prefix.trim_end_matches('.');
        for (key, value) in env::vars() {
            self.set_new(format!("{}.{}", prefix, key), value);
        }
    }

    /// Load a KEY=VALUE file; values are expanded against what is already defined
    ///
    /// The file is read with dotenv rules, so `${name}` references that should
    /// resolve against build properties must sit in single-quoted values.
    pub fn load_file(&mut self, path: &Path) -> ConfigResult<()> {
        let property_file_error = |error: String| ConfigError::PropertyFile {
            path: path.to_path_buf(),
            error,
        };

        let entries =
            dotenvy::from_path_iter(path).map_err(|e| property_file_error(e.to_string()))?;
        for entry in entries {
            let (key, value) = entry.map_err(|e| property_file_error(e.to_string()))?;
            let value = self
                .expand(&value)
                .map_err(|e| property_file_error(e.to_string()))?;
            self.set_new(key, value);
        }

        log::debug!("Loaded properties from {}", path.display());
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (name, value) in iter {
            properties.set(name, value);
        }
        properties
    }
}
