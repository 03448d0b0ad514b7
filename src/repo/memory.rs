use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, bail};

use super::KeyValueStore;

/// Process-local storage. Clones share the same entries, so a second
/// store built from a clone sees what the first one wrote.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryKeyValueStore {
    pub fn with_seed(seed: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        let store = Self::default();
        store.lock().extend(seed);
        store
    }

    /// Make subsequent `set` calls fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("in-memory store is read-only");
        }
        Ok(())
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.check_writable()?;
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
