//! # Storage Error Types
//!
//! Errors for the persistence layer. Backend failures are wrapped, never
//! discarded; a storage miss is not an error and surfaces as `None`.

use thiserror::Error;

/// Errors raised by a key/value backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DbError {
    /// The backend reported an I/O or internal failure.
    #[error("key-value store failure: {0}")]
    Backend(String),

    /// A store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Errors from the trie node storage service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeStorageError {
    /// A trie path was longer than the 64 nibbles a 32-byte key allows.
    #[error("trie path of {len} nibbles exceeds the 64-nibble maximum")]
    InvalidPathLength {
        /// The rejected length.
        len: usize,
    },

    /// An empty node value was offered for persistence.
    #[error("refusing to store an empty node value")]
    EmptyValue,

    /// The backing store failed.
    #[error("backing store failed")]
    Db(#[from] DbError),
}

/// Errors from resolving a node reference into a structural node.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeLoaderError {
    /// The storage lookup failed.
    #[error("node storage lookup failed")]
    Storage(#[from] NodeStorageError),

    /// The stored bytes did not decode as a trie node.
    #[error("stored node bytes failed to decode")]
    Codec(#[from] mpt::NodeCodecError),
}
