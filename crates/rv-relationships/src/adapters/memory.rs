//! In-memory key-value store.

use crate::domain::errors::KVStoreError;
use crate::ports::outbound::KeyValueStore;
use std::collections::HashMap;

#[derive(Default)]
pub struct InMemoryKVStore {
    data: HashMap<Vec<u8>, Vec<u8>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
        self.data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let mut store = InMemoryKVStore::new();
        store.put(b"relationships", b"blob").unwrap();
        assert_eq!(store.get(b"relationships").unwrap(), Some(b"blob".to_vec()));
        assert!(store.exists(b"relationships").unwrap());

        store.delete(b"relationships").unwrap();
        assert!(!store.exists(b"relationships").unwrap());
    }
}
