//! # mpt-storage: Trie Node Persistence
//!
//! Persists RLP-encoded trie nodes in a pluggable key/value store and
//! resolves node references back into structural nodes.
//!
//! ## Layout
//!
//! - `ports` - The `KeyValueStore` abstraction the host must implement,
//!   plus batch operations and read/write flags
//! - `keys` - Key schemes: plain node-hash keys and the half-path layout
//!   that adds path context for locality
//! - `service` - The `TrieNodeStorage` service (scheme-aware reads and
//!   writes, cross-scheme fallback, write batches) and the `NodeLoader`
//! - `adapters` - In-memory backend for tests and embedding
//! - `errors` - Error types, causes preserved
//!
//! ## Concurrency
//!
//! `KeyValueStore` methods take `&self`; adapters carry their own interior
//! synchronization. The active key scheme is a plain field on the storage
//! handle, so switching schemes requires exclusive access to the handle.

#![warn(missing_docs)]

pub mod adapters;
pub mod errors;
pub mod keys;
pub mod ports;
pub mod service;

pub use adapters::InMemoryKVStore;
pub use errors::{DbError, NodeLoaderError, NodeStorageError};
pub use keys::{KeyScheme, TriePath};
pub use ports::{BatchOp, KeyValueStore, ReadFlags, WriteFlags};
pub use service::{NodeLoader, NodeWriteBatch, StorageConfig, TrieNodeStorage};
