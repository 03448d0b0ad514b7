use anyhow::Result;

pub mod memory;
pub mod sqlite;

/// Flat key-value storage the task list is snapshotted into.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }
}
