//! # Outbound Ports
//!
//! The interfaces this library requires the host application to implement.
//! Production backends sit behind [`KeyValueStore`]; the in-memory adapter
//! in `adapters` serves tests and embedding.

use crate::errors::DbError;

/// Read hints a backend may use to schedule prefetching. Backends are free
/// to ignore them; they never change results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadFlags(u8);

impl ReadFlags {
    /// No hints.
    pub const NONE: ReadFlags = ReadFlags(0);
    /// The caller expects to read nearby keys soon.
    pub const HINT_READ_AHEAD: ReadFlags = ReadFlags(1);
    /// Wider read-ahead for deep top-level state paths.
    pub const HINT_READ_AHEAD_2: ReadFlags = ReadFlags(1 << 1);
    /// Read-ahead tuned for account storage ranges.
    pub const HINT_READ_AHEAD_3: ReadFlags = ReadFlags(1 << 2);

    /// Combine two hint sets.
    pub fn union(self, other: ReadFlags) -> ReadFlags {
        ReadFlags(self.0 | other.0)
    }

    /// Whether every hint in `other` is present in `self`.
    pub fn contains(self, other: ReadFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no hints are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Write hints. No hints are currently defined; the type reserves the slot
/// in the write path so backends can grow them without breaking callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteFlags(u8);

impl WriteFlags {
    /// No hints.
    pub const NONE: WriteFlags = WriteFlags(0);
}

/// One staged operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Put a key/value pair.
    Put {
        /// Database key.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Delete a key.
    Remove {
        /// Database key.
        key: Vec<u8>,
    },
}

impl BatchOp {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Remove operation.
    pub fn remove(key: impl Into<Vec<u8>>) -> Self {
        BatchOp::Remove { key: key.into() }
    }
}

/// Abstract interface for key/value database operations.
///
/// Methods take `&self`; implementations provide their own synchronization
/// so a handle can be shared. Returned values are independent clones and
/// are never mutated by the store afterwards.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key. Hints in `flags` may prime prefetching.
    fn get(&self, key: &[u8], flags: ReadFlags) -> Result<Option<Vec<u8>>, DbError>;

    /// Put a single key/value pair. The value is copied.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), DbError>;

    /// Delete a key. Deleting an absent key is not an error.
    fn remove(&self, key: &[u8]) -> Result<(), DbError>;

    /// Check whether a key exists.
    fn has(&self, key: &[u8]) -> Result<bool, DbError>;

    /// Apply a batch atomically: either every operation takes effect or
    /// none does.
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), DbError>;

    /// Flush buffered writes. With `only_wal` set, backends that keep a
    /// write-ahead log may stop after syncing it.
    fn flush(&self, only_wal: bool) -> Result<(), DbError>;

    /// Ask the backend to compact its on-disk representation.
    fn compact(&self) -> Result<(), DbError>;
}
