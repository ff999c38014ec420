//! # Node Loader
//!
//! Resolves an encoded node reference into a structural node. Inlined
//! references decode directly; hash references go through storage first.

use crate::errors::NodeLoaderError;
use crate::keys::TriePath;
use crate::ports::{KeyValueStore, ReadFlags};
use crate::service::storage::TrieNodeStorage;
use mpt::{decode_trie_node, rlp_encode, EncodedNode, Hash, TrieNode, EMPTY_TRIE_ROOT};

/// Resolves [`EncodedNode`] references against a storage handle.
pub struct NodeLoader<'a, S: KeyValueStore> {
    storage: &'a TrieNodeStorage<S>,
}

impl<'a, S: KeyValueStore> NodeLoader<'a, S> {
    /// Create a loader over a storage handle.
    pub fn new(storage: &'a TrieNodeStorage<S>) -> Self {
        Self { storage }
    }

    /// Resolve a node reference.
    ///
    /// `Empty` and the empty-trie root hash resolve to `None` without any
    /// storage access. A hash reference whose bytes are missing from
    /// storage also resolves to `None`: absent subtrees are an expected
    /// outcome of partial loads, not an error.
    pub fn load(
        &self,
        address_hash: Option<&Hash>,
        path: &TriePath,
        node: &EncodedNode,
        flags: ReadFlags,
    ) -> Result<Option<TrieNode>, NodeLoaderError> {
        match node {
            EncodedNode::Empty => Ok(None),

            EncodedNode::Raw(item) => {
                let bytes = rlp_encode(item);
                Ok(Some(decode_trie_node(&bytes)?))
            }

            EncodedNode::Hash(node_hash) => {
                if *node_hash == EMPTY_TRIE_ROOT {
                    return Ok(None);
                }
                match self.storage.get(address_hash, path, node_hash, flags)? {
                    None => Ok(None),
                    Some(bytes) => Ok(Some(decode_trie_node(&bytes)?)),
                }
            }
        }
    }
}
