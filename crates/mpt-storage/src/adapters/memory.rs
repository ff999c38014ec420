//! In-memory key/value backend.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::DbError;
use crate::ports::{BatchOp, KeyValueStore, ReadFlags};

/// In-memory implementation of [`KeyValueStore`] for tests and embedding.
///
/// Batch writes are atomic because every mutation holds the single write
/// lock. Production deployments put a persistent store behind the same
/// trait.
#[derive(Default)]
pub struct InMemoryKVStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8], _flags: ReadFlags) -> Result<Option<Vec<u8>>, DbError> {
        let data = self.data.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(data.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DbError> {
        let mut data = self.data.write().map_err(|_| DbError::LockPoisoned)?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<(), DbError> {
        let mut data = self.data.write().map_err(|_| DbError::LockPoisoned)?;
        data.remove(key);
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool, DbError> {
        let data = self.data.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(data.contains_key(key))
    }

    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), DbError> {
        let mut data = self.data.write().map_err(|_| DbError::LockPoisoned)?;
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Remove { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn flush(&self, _only_wal: bool) -> Result<(), DbError> {
        Ok(())
    }

    fn compact(&self) -> Result<(), DbError> {
        Ok(())
    }
}
