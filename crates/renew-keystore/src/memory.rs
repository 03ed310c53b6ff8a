use std::collections::HashMap;
use std::sync::Mutex;

use crate::{CredentialStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked<T>(
        &self,
        f: impl FnOnce(&mut HashMap<String, String>) -> T,
    ) -> Result<T, StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Unavailable {
            message: "failed to lock memory store".to_string(),
        })?;
        Ok(f(&mut entries))
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.locked(|entries| entries.get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
        self.locked(|entries| {
            entries.insert(name.to_string(), value.to_string());
        })
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        self.locked(|entries| {
            entries.remove(name);
        })
    }
}
