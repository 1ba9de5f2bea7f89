//! Format registry - shared key/value strings passed between steps

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Key/value store that lets a step's captured output parameterize later commands
///
/// Cloning the registry clones the handle, not the entries: every clone
/// observes the same values. Writes are last-write-wins.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value, or the empty string if the key was never set
    pub fn get(&self, key: &str) -> String {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Set a value, replacing any previous one
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        debug!("Setting formatter [{}] to [{}]", key, value);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    /// Remove every entry
    pub fn clear(&self) {
        debug!("Clearing the format registry");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all current entries
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
