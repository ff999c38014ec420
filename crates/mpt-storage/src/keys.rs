//! # Storage Key Schemes
//!
//! Two layouts for the database key under which a node's bytes live.
//!
//! The **Hash** scheme keys a node by its 32-byte hash alone. The
//! **HalfPath** scheme prefixes the hash with the node's position in the
//! trie, so siblings at nearby positions share a key prefix and range reads
//! can prefetch them:
//!
//! ```text
//! top-level state (42 bytes):  [flag | path[0..8] | path_len | node_hash]
//!                               flag = 0 if path_len <= 5 else 1
//! account storage (74 bytes):  [2 | address_hash | path[0..8] | path_len | node_hash]
//! ```
//!
//! Only the first 8 path bytes participate; that is enough to separate
//! siblings at the depths the layout is meant to accelerate.

use serde::{Deserialize, Serialize};

use crate::errors::NodeStorageError;
use mpt::{Hash, Nibbles};

/// Maximum trie path length in nibbles (a 32-byte hashed key).
pub const MAX_PATH_NIBBLES: usize = 64;

/// Length of a Hash-scheme database key.
pub const HASH_KEY_LEN: usize = 32;

/// Length of a HalfPath key for a top-level state node.
pub const HALF_PATH_STATE_KEY_LEN: usize = 42;

/// Length of a HalfPath key for an account storage node.
pub const HALF_PATH_STORAGE_KEY_LEN: usize = 74;

/// Selects the database key layout for node reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyScheme {
    /// The database key is the node hash.
    Hash,
    /// The database key carries path context ahead of the node hash.
    HalfPath,
    /// Alias for whatever the current preferred scheme is.
    Current,
}

impl KeyScheme {
    /// Resolve the `Current` alias to a concrete scheme.
    pub fn normalize(self) -> KeyScheme {
        match self {
            KeyScheme::Current => KeyScheme::HalfPath,
            scheme => scheme,
        }
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        KeyScheme::HalfPath
    }
}

/// A trie position: up to 64 nibbles packed two per byte, left-aligned in a
/// 32-byte buffer, with the nibble count carried separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriePath {
    bytes: [u8; 32],
    len: u8,
}

impl TriePath {
    /// The root position: no nibbles consumed.
    pub const EMPTY: TriePath = TriePath {
        bytes: [0; 32],
        len: 0,
    };

    /// Build a path from a packed buffer and its length in nibbles.
    pub fn new(bytes: [u8; 32], len: usize) -> Result<Self, NodeStorageError> {
        if len > MAX_PATH_NIBBLES {
            return Err(NodeStorageError::InvalidPathLength { len });
        }
        Ok(TriePath {
            bytes,
            len: len as u8,
        })
    }

    /// Pack a nibble path, high nibble first, left-aligned.
    pub fn from_nibbles(nibbles: &Nibbles) -> Result<Self, NodeStorageError> {
        if nibbles.len() > MAX_PATH_NIBBLES {
            return Err(NodeStorageError::InvalidPathLength { len: nibbles.len() });
        }
        let mut bytes = [0u8; 32];
        for (index, &nibble) in nibbles.0.iter().enumerate() {
            if index % 2 == 0 {
                bytes[index / 2] |= (nibble & 0x0F) << 4;
            } else {
                bytes[index / 2] |= nibble & 0x0F;
            }
        }
        Ok(TriePath {
            bytes,
            len: nibbles.len() as u8,
        })
    }

    /// Length of the path in nibbles.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the path is the root position.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed path buffer.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// The Hash-scheme database key for a node.
pub fn hash_key(node_hash: &Hash) -> Vec<u8> {
    node_hash.to_vec()
}

/// The HalfPath-scheme database key for a node.
///
/// `address_hash` distinguishes account-storage nodes (74-byte keys, flag 2)
/// from top-level state nodes (42-byte keys, flag 0 for shallow paths and 1
/// for deep ones).
pub fn half_path_key(address_hash: Option<&Hash>, path: &TriePath, node_hash: &Hash) -> Vec<u8> {
    match address_hash {
        None => {
            let flag = if path.len() <= 5 { 0u8 } else { 1u8 };
            let mut key = Vec::with_capacity(HALF_PATH_STATE_KEY_LEN);
            key.push(flag);
            key.extend_from_slice(&path.as_bytes()[..8]);
            key.push(path.len() as u8);
            key.extend_from_slice(node_hash);
            key
        }
        Some(address_hash) => {
            let mut key = Vec::with_capacity(HALF_PATH_STORAGE_KEY_LEN);
            key.push(2u8);
            key.extend_from_slice(address_hash);
            key.extend_from_slice(&path.as_bytes()[..8]);
            key.push(path.len() as u8);
            key.extend_from_slice(node_hash);
            key
        }
    }
}
