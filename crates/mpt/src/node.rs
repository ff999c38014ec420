//! # Trie Node Model and Structural Hasher
//!
//! The three node shapes of the Modified Merkle Patricia Trie and the
//! encoder that turns a node into the reference its parent embeds: either
//! the node's own RLP list (when its encoding is shorter than 32 bytes) or
//! the Keccak256 hash of that encoding.

use crate::errors::TrieHashError;
use crate::nibbles::Nibbles;
use crate::rlp::{keccak256, rlp_encode, RlpItem};
use crate::Hash;

// =============================================================================
// ENCODED NODE: how a parent refers to a child
// =============================================================================

/// A reference to a trie node as it appears inside its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodedNode {
    /// No node; encoded as the empty byte string.
    Empty,
    /// The node's RLP list embedded directly (its encoding is under 32 bytes).
    Raw(RlpItem),
    /// The Keccak256 hash of the node's RLP encoding.
    Hash(Hash),
}

impl EncodedNode {
    /// The RLP item this reference contributes to its parent's list.
    ///
    /// A `Raw` child embeds its list as-is; it is never re-encoded into a
    /// byte string.
    pub fn to_rlp_item(&self) -> RlpItem {
        match self {
            EncodedNode::Empty => RlpItem::Bytes(Vec::new()),
            EncodedNode::Hash(hash) => RlpItem::Bytes(hash.to_vec()),
            EncodedNode::Raw(item) => item.clone(),
        }
    }
}

// =============================================================================
// TRIE NODE: the three structural shapes
// =============================================================================

/// Node shapes in the Modified Merkle Patricia Trie.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrieNode {
    /// Terminal node: the remaining key nibbles and the bound value.
    Leaf {
        /// Nibbles from this node's depth down to the end of the key.
        rest_of_key: Nibbles,
        /// The value bound to the key.
        value: Vec<u8>,
    },

    /// Shared-prefix node: a non-empty nibble segment and a single child.
    Extension {
        /// The shared nibble segment. Never empty in a canonical trie.
        key_segment: Nibbles,
        /// Reference to the single child below the segment.
        subnode: EncodedNode,
    },

    /// 16-way node, one child slot per nibble, plus a value for the key
    /// that terminates at this depth (empty bytes if none).
    Branch {
        /// Child references indexed by nibble.
        subnodes: Box<[EncodedNode; 16]>,
        /// Value of the key ending exactly here, or empty.
        value: Vec<u8>,
    },
}

impl TrieNode {
    /// Build the RLP item shape this node hashes over.
    ///
    /// Leaf: `[hex_prefix(rest_of_key, leaf), value]`.
    /// Extension: `[hex_prefix(key_segment, extension), child]`.
    /// Branch: `[child_0, .., child_15, value]`.
    pub fn to_rlp_item(&self) -> Result<RlpItem, TrieHashError> {
        match self {
            TrieNode::Leaf { rest_of_key, value } => Ok(RlpItem::List(vec![
                RlpItem::Bytes(rest_of_key.to_compact(true)?),
                RlpItem::Bytes(value.clone()),
            ])),

            TrieNode::Extension {
                key_segment,
                subnode,
            } => Ok(RlpItem::List(vec![
                RlpItem::Bytes(key_segment.to_compact(false)?),
                subnode.to_rlp_item(),
            ])),

            TrieNode::Branch { subnodes, value } => {
                let mut items: Vec<RlpItem> = Vec::with_capacity(17);
                for subnode in subnodes.iter() {
                    items.push(subnode.to_rlp_item());
                }
                items.push(RlpItem::Bytes(value.clone()));
                Ok(RlpItem::List(items))
            }
        }
    }
}

/// An empty branch child array, all 16 slots absent.
pub fn empty_subnodes() -> Box<[EncodedNode; 16]> {
    Box::new(std::array::from_fn(|_| EncodedNode::Empty))
}

// =============================================================================
// STRUCTURAL HASHER
// =============================================================================

/// Encode a node into the reference its parent embeds.
///
/// `None` stands for an absent node and becomes [`EncodedNode::Empty`].
/// Otherwise the node's RLP list is serialized: encodings under 32 bytes are
/// inlined as [`EncodedNode::Raw`], everything else is replaced by the
/// Keccak256 hash of the encoded bytes. The 32-byte cutoff is strict; an
/// encoding of exactly 32 bytes is hashed.
pub fn encode_internal_node(node: Option<&TrieNode>) -> Result<EncodedNode, TrieHashError> {
    let node = match node {
        None => return Ok(EncodedNode::Empty),
        Some(node) => node,
    };

    let item = node.to_rlp_item()?;
    let encoded = rlp_encode(&item);
    if encoded.len() < 32 {
        Ok(EncodedNode::Raw(item))
    } else {
        Ok(EncodedNode::Hash(keccak256(&encoded)))
    }
}
