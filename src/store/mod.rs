//! Merged, read-only configuration entries.
//!
//! Keys are colon-delimited paths (`logging:level`) compared ASCII
//! case-insensitively. Entries enumerate in first-insertion order; a later
//! write to an existing key replaces the value in place and keeps the
//! spelling the key was first seen with.

pub mod document;
pub mod sources;

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::error::ConfigError;

pub use sources::ConfigSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigurationStore {
    entries: Vec<KeyValuePair>,
    index: HashMap<String, usize>,
}

impl ConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::default()
    }

    fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key.to_ascii_lowercase()) {
            Some(&pos) => self.entries[pos].value = value,
            None => {
                self.index
                    .insert(key.to_ascii_lowercase(), self.entries.len());
                self.entries.push(KeyValuePair { key, value });
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(&key.to_ascii_lowercase())
            .map(|&pos| self.entries[pos].value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyValuePair> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ConfigurationStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.set(key, value);
        }
        store
    }
}

/// Serializes as a sequence of `{"key", "value"}` objects in enumeration order.
impl Serialize for ConfigurationStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Applies sources in order; later sources take precedence.
#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    sources: Vec<ConfigSource>,
}

impl ConfigurationBuilder {
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn build(self) -> Result<ConfigurationStore, ConfigError> {
        let mut store = ConfigurationStore::new();
        for source in &self.sources {
            let pairs = source.load()?;
            tracing::debug!(source = %source, entries = pairs.len(), "loaded configuration source");
            for (key, value) in pairs {
                store.set(key, value);
            }
        }
        Ok(store)
    }
}
