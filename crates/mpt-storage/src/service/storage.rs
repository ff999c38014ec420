//! # Trie Node Storage Service
//!
//! Reads and writes encoded node bytes through a [`KeyValueStore`] under
//! the active key scheme. Reads that miss under the active scheme fall
//! back to the other scheme's key, which keeps a store readable while a
//! scheme migration is in flight.
//!
//! The canonical empty node is special-cased everywhere: queries at
//! `EMPTY_TRIE_ROOT` answer `0x80` directly and writes at it are dropped,
//! so the empty node is never physically persisted.

use serde::{Deserialize, Serialize};

use crate::errors::NodeStorageError;
use crate::keys::{half_path_key, hash_key, KeyScheme, TriePath};
use crate::ports::{BatchOp, KeyValueStore, ReadFlags, WriteFlags};
use mpt::{keccak256, Hash, EMPTY_TRIE_ROOT};

/// RLP encoding of empty bytes, the canonical empty-trie node.
const EMPTY_NODE_BYTES: [u8; 1] = [0x80];

/// Configuration accepted by [`TrieNodeStorage`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// The key scheme to read and write under. `Current` resolves to the
    /// preferred scheme at construction.
    pub scheme: KeyScheme,
}

/// Trie node storage over a pluggable key/value backend.
///
/// The active scheme is a plain field on the handle; switching it requires
/// exclusive access and must not race in-flight reads or writes.
pub struct TrieNodeStorage<S: KeyValueStore> {
    store: S,
    scheme: KeyScheme,
}

impl<S: KeyValueStore> TrieNodeStorage<S> {
    /// Wrap a backend with the default scheme.
    pub fn new(store: S) -> Self {
        Self::with_config(store, StorageConfig::default())
    }

    /// Wrap a backend with explicit configuration.
    pub fn with_config(store: S, config: StorageConfig) -> Self {
        Self {
            store,
            scheme: config.scheme.normalize(),
        }
    }

    /// The active key scheme.
    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    /// Switch the active key scheme. `Current` resolves to the preferred
    /// scheme; previously written nodes stay reachable through the read
    /// fallback.
    pub fn set_scheme(&mut self, scheme: KeyScheme) {
        self.scheme = scheme.normalize();
    }

    /// Borrow the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Database keys for a node: the active scheme's key first, then the
    /// other scheme's key for the read fallback.
    fn keys_for(
        &self,
        address_hash: Option<&Hash>,
        path: &TriePath,
        node_hash: &Hash,
    ) -> (Vec<u8>, Vec<u8>) {
        let hash_scheme_key = hash_key(node_hash);
        let half_path_scheme_key = half_path_key(address_hash, path, node_hash);
        match self.scheme {
            KeyScheme::Hash => (hash_scheme_key, half_path_scheme_key),
            _ => (half_path_scheme_key, hash_scheme_key),
        }
    }

    /// Fold position-dependent prefetch hints into the caller's flags.
    fn effective_read_flags(
        &self,
        address_hash: Option<&Hash>,
        path: &TriePath,
        flags: ReadFlags,
    ) -> ReadFlags {
        if self.scheme != KeyScheme::HalfPath || !flags.contains(ReadFlags::HINT_READ_AHEAD) {
            return flags;
        }
        match address_hash {
            None if path.len() > 5 => flags.union(ReadFlags::HINT_READ_AHEAD_2),
            Some(_) => flags.union(ReadFlags::HINT_READ_AHEAD_3),
            None => flags,
        }
    }

    /// Look up a node's encoded bytes.
    ///
    /// `EMPTY_TRIE_ROOT` answers the canonical `0x80` without touching the
    /// store. A miss under the active scheme retries the other scheme's key
    /// before reporting absence.
    pub fn get(
        &self,
        address_hash: Option<&Hash>,
        path: &TriePath,
        node_hash: &Hash,
        flags: ReadFlags,
    ) -> Result<Option<Vec<u8>>, NodeStorageError> {
        if *node_hash == EMPTY_TRIE_ROOT {
            return Ok(Some(EMPTY_NODE_BYTES.to_vec()));
        }

        let flags = self.effective_read_flags(address_hash, path, flags);
        let (active_key, fallback_key) = self.keys_for(address_hash, path, node_hash);

        if let Some(value) = self.store.get(&active_key, flags)? {
            return Ok(Some(value));
        }
        match self.store.get(&fallback_key, flags)? {
            Some(value) => {
                tracing::debug!(
                    "[mpt-storage] cross-scheme fallback hit for node {:02x?}...",
                    &node_hash[..4]
                );
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Check whether a node's bytes are available, with the same fallback
    /// as [`TrieNodeStorage::get`].
    pub fn key_exists(
        &self,
        address_hash: Option<&Hash>,
        path: &TriePath,
        node_hash: &Hash,
    ) -> Result<bool, NodeStorageError> {
        if *node_hash == EMPTY_TRIE_ROOT {
            return Ok(true);
        }

        let (active_key, fallback_key) = self.keys_for(address_hash, path, node_hash);
        if self.store.has(&active_key)? {
            return Ok(true);
        }
        Ok(self.store.has(&fallback_key)?)
    }

    /// Persist a node's encoded bytes under the active scheme.
    ///
    /// Writes at `EMPTY_TRIE_ROOT` are dropped. The value is copied; the
    /// caller's buffer stays untouched.
    pub fn set(
        &self,
        address_hash: Option<&Hash>,
        path: &TriePath,
        node_hash: &Hash,
        value: &[u8],
        _flags: WriteFlags,
    ) -> Result<(), NodeStorageError> {
        if *node_hash == EMPTY_TRIE_ROOT {
            return Ok(());
        }
        if value.is_empty() {
            return Err(NodeStorageError::EmptyValue);
        }

        let (active_key, _) = self.keys_for(address_hash, path, node_hash);
        tracing::trace!(
            "[mpt-storage] storing {} node bytes for {:02x?}...",
            value.len(),
            &node_hash[..4]
        );
        self.store.put(&active_key, value)?;
        Ok(())
    }

    /// Delete a node's bytes under the active scheme. A no-op for
    /// `EMPTY_TRIE_ROOT`.
    pub fn remove(
        &self,
        address_hash: Option<&Hash>,
        path: &TriePath,
        node_hash: &Hash,
    ) -> Result<(), NodeStorageError> {
        if *node_hash == EMPTY_TRIE_ROOT {
            return Ok(());
        }
        let (active_key, _) = self.keys_for(address_hash, path, node_hash);
        self.store.remove(&active_key)?;
        Ok(())
    }

    /// Hash `bytes`, persist them keyed by their own hash at the root
    /// position, and return the hash.
    pub fn persist_encoded_node(&self, bytes: &[u8]) -> Result<Hash, NodeStorageError> {
        let node_hash = keccak256(bytes);
        self.set(None, &TriePath::EMPTY, &node_hash, bytes, WriteFlags::NONE)?;
        Ok(node_hash)
    }

    /// Start a staged write batch. Staged operations commit atomically when
    /// the batch leaves scope, or earlier through
    /// [`NodeWriteBatch::commit`]; [`NodeWriteBatch::clear`] discards them.
    pub fn start_write_batch(&self) -> NodeWriteBatch<'_, S> {
        NodeWriteBatch {
            storage: self,
            ops: Vec::new(),
            committed: false,
        }
    }

    /// Flush buffered writes in the backend.
    pub fn flush(&self, only_wal: bool) -> Result<(), NodeStorageError> {
        self.store.flush(only_wal)?;
        Ok(())
    }

    /// Compact the backend.
    pub fn compact(&self) -> Result<(), NodeStorageError> {
        self.store.compact()?;
        Ok(())
    }
}

/// A staged batch of node writes with the same scheme discipline as the
/// storage handle that created it.
///
/// Dropping the batch commits whatever is staged; [`NodeWriteBatch::clear`]
/// empties it so nothing applies. Callers that need to observe commit
/// failures call [`NodeWriteBatch::commit`] instead of relying on the drop.
pub struct NodeWriteBatch<'a, S: KeyValueStore> {
    storage: &'a TrieNodeStorage<S>,
    ops: Vec<BatchOp>,
    committed: bool,
}

impl<S: KeyValueStore> NodeWriteBatch<'_, S> {
    /// Stage a node write under the active scheme. Writes at
    /// `EMPTY_TRIE_ROOT` are dropped, like unbatched writes.
    pub fn set(
        &mut self,
        address_hash: Option<&Hash>,
        path: &TriePath,
        node_hash: &Hash,
        value: &[u8],
    ) -> Result<(), NodeStorageError> {
        if *node_hash == EMPTY_TRIE_ROOT {
            return Ok(());
        }
        if value.is_empty() {
            return Err(NodeStorageError::EmptyValue);
        }
        let (active_key, _) = self.storage.keys_for(address_hash, path, node_hash);
        self.ops.push(BatchOp::put(active_key, value.to_vec()));
        Ok(())
    }

    /// Stage a node deletion under the active scheme.
    pub fn remove(&mut self, address_hash: Option<&Hash>, path: &TriePath, node_hash: &Hash) {
        if *node_hash == EMPTY_TRIE_ROOT {
            return;
        }
        let (active_key, _) = self.storage.keys_for(address_hash, path, node_hash);
        self.ops.push(BatchOp::remove(active_key));
    }

    /// Discard every staged operation.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch holds no staged operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Commit the staged operations now, surfacing any backend failure.
    pub fn commit(mut self) -> Result<(), NodeStorageError> {
        self.committed = true;
        let ops = std::mem::take(&mut self.ops);
        if ops.is_empty() {
            return Ok(());
        }
        self.storage.store.write_batch(ops)?;
        Ok(())
    }
}

impl<S: KeyValueStore> Drop for NodeWriteBatch<'_, S> {
    fn drop(&mut self) {
        if self.committed || self.ops.is_empty() {
            return;
        }
        let ops = std::mem::take(&mut self.ops);
        if let Err(error) = self.storage.store.write_batch(ops) {
            tracing::warn!("[mpt-storage] write batch dropped uncommitted: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryKVStore;
    use crate::errors::DbError;
    use crate::keys::{HALF_PATH_STATE_KEY_LEN, HASH_KEY_LEN};
    use mpt::Nibbles;
    use std::sync::Mutex;

    fn storage_with_scheme(scheme: KeyScheme) -> TrieNodeStorage<InMemoryKVStore> {
        TrieNodeStorage::with_config(InMemoryKVStore::new(), StorageConfig { scheme })
    }

    #[test]
    fn test_empty_trie_root_is_virtual() {
        let storage = storage_with_scheme(KeyScheme::HalfPath);

        // Reads answer the canonical bytes without a backing entry.
        let bytes = storage
            .get(None, &TriePath::EMPTY, &EMPTY_TRIE_ROOT, ReadFlags::NONE)
            .unwrap();
        assert_eq!(bytes, Some(vec![0x80]));
        assert!(storage
            .key_exists(None, &TriePath::EMPTY, &EMPTY_TRIE_ROOT)
            .unwrap());

        // Writes and removals are dropped; nothing reaches the store.
        storage
            .set(
                None,
                &TriePath::EMPTY,
                &EMPTY_TRIE_ROOT,
                &[0x80],
                WriteFlags::NONE,
            )
            .unwrap();
        storage
            .remove(None, &TriePath::EMPTY, &EMPTY_TRIE_ROOT)
            .unwrap();
        assert!(storage.store().is_empty());
    }

    #[test]
    fn test_set_get_roundtrip_under_each_scheme() {
        for scheme in [KeyScheme::Hash, KeyScheme::HalfPath] {
            let storage = storage_with_scheme(scheme);
            let node_hash = [0x42; 32];

            storage
                .set(
                    None,
                    &TriePath::EMPTY,
                    &node_hash,
                    b"node-bytes",
                    WriteFlags::NONE,
                )
                .unwrap();
            assert_eq!(
                storage
                    .get(None, &TriePath::EMPTY, &node_hash, ReadFlags::NONE)
                    .unwrap(),
                Some(b"node-bytes".to_vec())
            );
            assert!(storage
                .key_exists(None, &TriePath::EMPTY, &node_hash)
                .unwrap());

            storage.remove(None, &TriePath::EMPTY, &node_hash).unwrap();
            assert_eq!(
                storage
                    .get(None, &TriePath::EMPTY, &node_hash, ReadFlags::NONE)
                    .unwrap(),
                None
            );
        }
    }

    #[test]
    fn test_cross_scheme_fallback_hash_to_half_path() {
        let mut storage = storage_with_scheme(KeyScheme::Hash);
        let node_hash = [0x07; 32];
        storage
            .set(None, &TriePath::EMPTY, &node_hash, b"v", WriteFlags::NONE)
            .unwrap();

        storage.set_scheme(KeyScheme::HalfPath);
        assert_eq!(
            storage
                .get(None, &TriePath::EMPTY, &node_hash, ReadFlags::NONE)
                .unwrap(),
            Some(b"v".to_vec())
        );
        assert!(storage
            .key_exists(None, &TriePath::EMPTY, &node_hash)
            .unwrap());
    }

    #[test]
    fn test_cross_scheme_fallback_half_path_to_hash() {
        let mut storage = storage_with_scheme(KeyScheme::HalfPath);
        let node_hash = [0x07; 32];
        storage
            .set(None, &TriePath::EMPTY, &node_hash, b"v", WriteFlags::NONE)
            .unwrap();

        storage.set_scheme(KeyScheme::Hash);
        assert_eq!(
            storage
                .get(None, &TriePath::EMPTY, &node_hash, ReadFlags::NONE)
                .unwrap(),
            Some(b"v".to_vec())
        );
        assert!(storage
            .key_exists(None, &TriePath::EMPTY, &node_hash)
            .unwrap());
    }

    #[test]
    fn test_current_scheme_resolves_to_half_path() {
        let mut storage = storage_with_scheme(KeyScheme::Current);
        assert_eq!(storage.scheme(), KeyScheme::HalfPath);
        storage.set_scheme(KeyScheme::Current);
        assert_eq!(storage.scheme(), KeyScheme::HalfPath);
    }

    #[test]
    fn test_rejects_empty_value() {
        let storage = storage_with_scheme(KeyScheme::HalfPath);
        let result = storage.set(None, &TriePath::EMPTY, &[0x01; 32], &[], WriteFlags::NONE);
        assert_eq!(result, Err(NodeStorageError::EmptyValue));
    }

    #[test]
    fn test_persist_encoded_node() {
        let storage = storage_with_scheme(KeyScheme::HalfPath);
        let bytes = b"node-bytes";

        let node_hash = storage.persist_encoded_node(bytes).unwrap();
        assert_eq!(
            hex::encode(node_hash),
            "5c45d3b2ddacd4bfef51c8cc0a0287262b600077fc73823407ff0c1d5f90fb06"
        );
        assert_eq!(
            storage
                .get(None, &TriePath::EMPTY, &node_hash, ReadFlags::NONE)
                .unwrap(),
            Some(bytes.to_vec())
        );
    }

    #[test]
    fn test_persist_empty_node_is_dropped() {
        let storage = storage_with_scheme(KeyScheme::HalfPath);
        let node_hash = storage.persist_encoded_node(&[0x80]).unwrap();
        assert_eq!(node_hash, EMPTY_TRIE_ROOT);
        assert!(storage.store().is_empty());
    }

    #[test]
    fn test_batch_commits_on_scope_exit() {
        let storage = storage_with_scheme(KeyScheme::HalfPath);
        {
            let mut batch = storage.start_write_batch();
            batch
                .set(None, &TriePath::EMPTY, &[0x01; 32], b"one")
                .unwrap();
            batch
                .set(None, &TriePath::EMPTY, &[0x02; 32], b"two")
                .unwrap();
            assert_eq!(batch.len(), 2);
            // Nothing lands until the batch leaves scope.
            assert!(storage.store().is_empty());
        }
        assert_eq!(storage.store().len(), 2);
    }

    #[test]
    fn test_cleared_batch_applies_nothing() {
        let storage = storage_with_scheme(KeyScheme::HalfPath);
        {
            let mut batch = storage.start_write_batch();
            batch
                .set(None, &TriePath::EMPTY, &[0x01; 32], b"one")
                .unwrap();
            batch.clear();
            assert!(batch.is_empty());
        }
        assert!(storage.store().is_empty());
    }

    #[test]
    fn test_batch_explicit_commit_and_remove() {
        let storage = storage_with_scheme(KeyScheme::HalfPath);
        storage
            .set(None, &TriePath::EMPTY, &[0x01; 32], b"stale", WriteFlags::NONE)
            .unwrap();

        let mut batch = storage.start_write_batch();
        batch.remove(None, &TriePath::EMPTY, &[0x01; 32]);
        batch
            .set(None, &TriePath::EMPTY, &[0x02; 32], b"fresh")
            .unwrap();
        batch.commit().unwrap();

        assert_eq!(
            storage
                .get(None, &TriePath::EMPTY, &[0x01; 32], ReadFlags::NONE)
                .unwrap(),
            None
        );
        assert_eq!(
            storage
                .get(None, &TriePath::EMPTY, &[0x02; 32], ReadFlags::NONE)
                .unwrap(),
            Some(b"fresh".to_vec())
        );
    }

    /// Backend double that records the flags each read arrives with.
    #[derive(Default)]
    struct RecordingStore {
        flags_seen: Mutex<Vec<ReadFlags>>,
    }

    impl KeyValueStore for RecordingStore {
        fn get(&self, _key: &[u8], flags: ReadFlags) -> Result<Option<Vec<u8>>, DbError> {
            self.flags_seen
                .lock()
                .map_err(|_| DbError::LockPoisoned)?
                .push(flags);
            Ok(None)
        }
        fn put(&self, _key: &[u8], _value: &[u8]) -> Result<(), DbError> {
            Ok(())
        }
        fn remove(&self, _key: &[u8]) -> Result<(), DbError> {
            Ok(())
        }
        fn has(&self, _key: &[u8]) -> Result<bool, DbError> {
            Ok(false)
        }
        fn write_batch(&self, _ops: Vec<BatchOp>) -> Result<(), DbError> {
            Ok(())
        }
        fn flush(&self, _only_wal: bool) -> Result<(), DbError> {
            Ok(())
        }
        fn compact(&self) -> Result<(), DbError> {
            Ok(())
        }
    }

    #[test]
    fn test_read_ahead_hints_widen_by_position() {
        let storage = TrieNodeStorage::with_config(
            RecordingStore::default(),
            StorageConfig {
                scheme: KeyScheme::HalfPath,
            },
        );
        let node_hash = [0x0A; 32];
        let deep_path = TriePath::from_nibbles(&Nibbles(vec![0x1; 6])).unwrap();

        // Deep top-level path widens to hint 2.
        storage
            .get(None, &deep_path, &node_hash, ReadFlags::HINT_READ_AHEAD)
            .unwrap();
        // Account storage widens to hint 3.
        storage
            .get(
                Some(&[0x22; 32]),
                &TriePath::EMPTY,
                &node_hash,
                ReadFlags::HINT_READ_AHEAD,
            )
            .unwrap();
        // Without the base hint nothing is added.
        storage
            .get(None, &deep_path, &node_hash, ReadFlags::NONE)
            .unwrap();

        let seen = storage.store().flags_seen.lock().unwrap().clone();
        assert!(seen[0].contains(ReadFlags::HINT_READ_AHEAD_2));
        assert!(seen[2].contains(ReadFlags::HINT_READ_AHEAD_3));
        assert!(seen[4].is_empty());
    }

    #[test]
    fn test_key_lengths_per_scheme() {
        // Observed through the recording double: the key the service hands
        // the backend has the documented layout length.
        struct KeyLenStore {
            lens: Mutex<Vec<usize>>,
        }
        impl KeyValueStore for KeyLenStore {
            fn get(&self, key: &[u8], _flags: ReadFlags) -> Result<Option<Vec<u8>>, DbError> {
                self.lens
                    .lock()
                    .map_err(|_| DbError::LockPoisoned)?
                    .push(key.len());
                Ok(Some(vec![0x01]))
            }
            fn put(&self, key: &[u8], _value: &[u8]) -> Result<(), DbError> {
                self.lens
                    .lock()
                    .map_err(|_| DbError::LockPoisoned)?
                    .push(key.len());
                Ok(())
            }
            fn remove(&self, _key: &[u8]) -> Result<(), DbError> {
                Ok(())
            }
            fn has(&self, _key: &[u8]) -> Result<bool, DbError> {
                Ok(false)
            }
            fn write_batch(&self, _ops: Vec<BatchOp>) -> Result<(), DbError> {
                Ok(())
            }
            fn flush(&self, _only_wal: bool) -> Result<(), DbError> {
                Ok(())
            }
            fn compact(&self) -> Result<(), DbError> {
                Ok(())
            }
        }

        let storage = TrieNodeStorage::new(KeyLenStore {
            lens: Mutex::new(Vec::new()),
        });
        let node_hash = [0x0B; 32];
        storage
            .set(None, &TriePath::EMPTY, &node_hash, b"v", WriteFlags::NONE)
            .unwrap();
        storage
            .get(None, &TriePath::EMPTY, &node_hash, ReadFlags::NONE)
            .unwrap();

        let lens = storage.store().lens.lock().unwrap().clone();
        assert_eq!(lens, vec![HALF_PATH_STATE_KEY_LEN, HALF_PATH_STATE_KEY_LEN]);

        let mut storage = storage;
        storage.set_scheme(KeyScheme::Hash);
        storage
            .get(None, &TriePath::EMPTY, &node_hash, ReadFlags::NONE)
            .unwrap();
        let lens = storage.store().lens.lock().unwrap().clone();
        assert_eq!(*lens.last().unwrap(), HASH_KEY_LEN);
    }
}
