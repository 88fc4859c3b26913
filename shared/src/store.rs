//! String key-value persistence, shaped like browser local storage.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub const USERS_KEY: &str = "bpe:users";
pub const SESSION_KEY: &str = "bpe:session";
const PROJECTS_PREFIX: &str = "bpe:projects:";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("storage is full")]
    QuotaExceeded,
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    #[error("could not serialize {key}: {reason}")]
    Serialize { key: String, reason: String },
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str);
}

pub fn projects_key(owner: Option<&str>) -> String {
    format!("{PROJECTS_PREFIX}{}", owner.unwrap_or("anonymous"))
}

/// Reads and decodes a JSON value. Missing keys and undecodable values both
/// come back as `None`; the latter is logged.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, %error, "ignoring corrupt stored value");
            None
        }
    }
}

pub fn save_json<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|error| StoreError::Serialize {
        key: key.to_string(),
        reason: error.to_string(),
    })?;
    store.set(key, &raw)
}

/// In-memory store with an optional byte quota over keys plus values.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(quota),
        }
    }

    fn used_without(&self, key: &str) -> usize {
        self.entries
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(existing, value)| existing.len() + value.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            if self.used_without(key) + key.len() + value.len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}
