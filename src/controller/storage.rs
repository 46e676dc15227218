//! Storage seam for the persisted snapshot

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::database::DatabaseManager;

/// Key under which the panel snapshot is stored
pub const STATE_KEY: &str = "acai.panelState";

/// Simple get/set collaborator. Implementations must be cheap enough to call on every change.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

impl StateStore for DatabaseManager {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.get_setting(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.set_setting(key, value, "json")
    }
}

/// Process-local store, used when the database is unavailable
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|e| anyhow!("Failed to lock memory store: {}", e))?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| anyhow!("Failed to lock memory store: {}", e))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
