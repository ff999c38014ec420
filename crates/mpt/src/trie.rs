//! # Root Computation and Trie Facade
//!
//! Builds the canonical leaf/extension/branch tree over a flat key/value
//! map (patricialize) and reduces it to the 32-byte Merkle root. A small
//! in-memory facade layers `put`/`get`/`remove` on top with the convention
//! that a configurable default value means "absent".
//!
//! ## Invariants
//!
//! - The root depends only on the set of key/value bindings, never on
//!   insertion order.
//! - The empty map roots to `EMPTY_TRIE_ROOT`.
//! - Keys equal to the configured default value are never stored, so a
//!   facade holding only default bindings roots to `EMPTY_TRIE_ROOT`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{PatricializeError, TrieError, TrieRootError};
use crate::nibbles::Nibbles;
use crate::node::{empty_subnodes, encode_internal_node, EncodedNode, TrieNode};
use crate::rlp::{keccak256, rlp_encode};
use crate::{Hash, EMPTY_TRIE_ROOT};

// =============================================================================
// PATRICIALIZE: flat map to canonical tree
// =============================================================================

type Entry<'a> = (&'a Nibbles, &'a [u8]);

/// Build the canonical trie node over `obj`, with the first `level` nibbles
/// of every key already consumed.
///
/// Returns `None` for an empty map. A single entry becomes a leaf; a shared
/// prefix becomes an extension over the recursion at the deeper level; and
/// divergent keys split into a 16-way branch, whose own value is the entry
/// terminating exactly at this depth. Children are hashed with
/// [`encode_internal_node`] at every recursion boundary, so the inline
/// decision never leaks in here.
pub fn patricialize(
    obj: &BTreeMap<Nibbles, Vec<u8>>,
    level: usize,
) -> Result<Option<TrieNode>, TrieRootError> {
    let items: Vec<Entry> = obj.iter().map(|(k, v)| (k, v.as_slice())).collect();
    build_node(&items, level)
}

/// Recursively build trie nodes over a sorted entry slice.
fn build_node(items: &[Entry], level: usize) -> Result<Option<TrieNode>, TrieRootError> {
    let (first_key, first_value) = match items.first() {
        None => return Ok(None),
        Some(&(key, value)) => (key, value),
    };
    if first_key.len() < level {
        return Err(PatricializeError::KeyTooShort {
            key_len: first_key.len(),
            level,
        }
        .into());
    }

    if items.len() == 1 {
        return Ok(Some(TrieNode::Leaf {
            rest_of_key: first_key.slice(level),
            value: first_value.to_vec(),
        }));
    }

    // Longest prefix shared by every key below this level.
    let mut prefix_len = first_key.len() - level;
    for &(key, _) in &items[1..] {
        if key.len() < level {
            return Err(PatricializeError::KeyTooShort {
                key_len: key.len(),
                level,
            }
            .into());
        }
        let common = key.0[level..]
            .iter()
            .zip(&first_key.0[level..])
            .take_while(|(a, b)| a == b)
            .count();
        prefix_len = prefix_len.min(common);
        if prefix_len == 0 {
            break;
        }
    }

    if prefix_len > 0 {
        let child = build_node(items, level + prefix_len)?;
        let subnode = encode_internal_node(child.as_ref())?;
        return Ok(Some(TrieNode::Extension {
            key_segment: first_key.slice_range(level, level + prefix_len),
            subnode,
        }));
    }

    // Divergence at this level: split into 16 nibble groups.
    let mut groups: [Vec<Entry>; 16] = Default::default();
    let mut value = Vec::new();
    for &(key, entry_value) in items {
        if key.len() == level {
            value = entry_value.to_vec();
        } else if key.len() < level {
            return Err(PatricializeError::KeyTooShort {
                key_len: key.len(),
                level,
            }
            .into());
        } else {
            let nibble = key.at(level);
            if nibble > 0x0F {
                return Err(PatricializeError::InvalidNibble { value: nibble }.into());
            }
            groups[nibble as usize].push((key, entry_value));
        }
    }

    let mut subnodes = empty_subnodes();
    for (nibble, group) in groups.iter().enumerate() {
        let child = build_node(group, level + 1)?;
        subnodes[nibble] = encode_internal_node(child.as_ref())?;
    }

    Ok(Some(TrieNode::Branch { subnodes, value }))
}

// =============================================================================
// ROOT COMPUTATION
// =============================================================================

/// Compute the Merkle root over a set of key/value entries.
///
/// When `secured` is set, every key is Keccak256-hashed before its nibble
/// expansion. Duplicate keys keep the last value seen. The empty entry set
/// roots to [`EMPTY_TRIE_ROOT`].
pub fn trie_root<I>(entries: I, secured: bool) -> Result<Hash, TrieRootError>
where
    I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
{
    let mut obj: BTreeMap<Nibbles, Vec<u8>> = BTreeMap::new();
    for (key, value) in entries {
        let key = if secured {
            keccak256(&key).to_vec()
        } else {
            key
        };
        obj.insert(Nibbles::from_bytes(&key), value);
    }

    let root_node = patricialize(&obj, 0)?;
    let encoded = encode_internal_node(root_node.as_ref())?;
    Ok(match encoded {
        EncodedNode::Hash(hash) => hash,
        EncodedNode::Raw(item) => keccak256(&rlp_encode(&item)),
        EncodedNode::Empty => EMPTY_TRIE_ROOT,
    })
}

// =============================================================================
// TRIE FACADE
// =============================================================================

/// Configuration for the in-memory trie facade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieConfig {
    /// Keccak256-hash keys before nibble expansion.
    pub secured: bool,
    /// The value that stands for "absent". Binding a key to it removes the
    /// key; reading a missing key returns it.
    pub default_value: Vec<u8>,
}

impl Default for TrieConfig {
    fn default() -> Self {
        Self {
            secured: false,
            default_value: Vec::new(),
        }
    }
}

/// In-memory Merkle Patricia Trie.
///
/// Holds only non-default bindings in an ordered map and recomputes the
/// root on demand. Reads hand back clones; the map is never aliased.
#[derive(Clone, Debug, Default)]
pub struct Trie {
    secured: bool,
    default_value: Vec<u8>,
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Trie {
    /// Create an unsecured trie whose default value is empty bytes.
    pub fn new() -> Self {
        Self::with_config(TrieConfig::default())
    }

    /// Create a trie with explicit configuration.
    pub fn with_config(config: TrieConfig) -> Self {
        Self {
            secured: config.secured,
            default_value: config.default_value,
            data: BTreeMap::new(),
        }
    }

    /// Whether keys are hashed before nibble expansion.
    pub fn secured(&self) -> bool {
        self.secured
    }

    /// The configured "absent" value.
    pub fn default_value(&self) -> &[u8] {
        &self.default_value
    }

    /// Bind `key` to `value`.
    ///
    /// Binding the configured default value deletes the key instead: the
    /// trie represents a default binding by omitting it.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        if value == self.default_value {
            self.data.remove(key);
        } else {
            self.data.insert(key.to_vec(), value.to_vec());
        }
    }

    /// Read the value bound to `key`.
    ///
    /// Returns a clone of the stored value, or a clone of the configured
    /// default when the key is absent.
    pub fn get(&self, key: &[u8]) -> Vec<u8> {
        self.data
            .get(key)
            .cloned()
            .unwrap_or_else(|| self.default_value.clone())
    }

    /// Delete the binding for `key`, if any.
    pub fn remove(&mut self, key: &[u8]) {
        self.data.remove(key);
    }

    /// Whether a non-default binding exists for `key`.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.data.contains_key(key)
    }

    /// Number of non-default bindings.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the trie holds no non-default bindings.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over the stored bindings in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.data.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Compute the Merkle root over the current bindings.
    pub fn root(&self) -> Result<Hash, TrieError> {
        let entries = self.data.iter().map(|(k, v)| (k.clone(), v.clone()));
        Ok(trie_root(entries, self.secured)?)
    }
}
