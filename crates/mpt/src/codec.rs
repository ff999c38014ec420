//! # Node Decoder
//!
//! Parses the RLP encoding of a trie node back into its structural form.
//! Two-item lists are leaves or extensions, told apart by the hex-prefix
//! leaf flag; seventeen-item lists are branches.

use crate::errors::NodeCodecError;
use crate::nibbles::Nibbles;
use crate::node::{EncodedNode, TrieNode};
use crate::rlp::{rlp_decode, RlpItem};

/// Decode an RLP-encoded trie node.
///
/// The input must be a single top-level list with no trailing bytes. Child
/// slots decode as: empty string to an absent child, a 32-byte string to a
/// hash reference, a nested list to an inlined node; any other byte length
/// is rejected.
pub fn decode_trie_node(bytes: &[u8]) -> Result<TrieNode, NodeCodecError> {
    let (item, rest) = rlp_decode(bytes)?;
    if !rest.is_empty() {
        return Err(NodeCodecError::TrailingBytes {
            remaining: rest.len(),
        });
    }

    let items = match item {
        RlpItem::List(items) => items,
        RlpItem::Bytes(_) => return Err(NodeCodecError::InvalidTopLevel),
    };

    match items.len() {
        2 => decode_leaf_or_extension(items),
        17 => decode_branch(items),
        arity => Err(NodeCodecError::InvalidArity { arity }),
    }
}

fn decode_leaf_or_extension(items: Vec<RlpItem>) -> Result<TrieNode, NodeCodecError> {
    let mut items = items.into_iter();
    let path_item = items.next().ok_or(NodeCodecError::InvalidArity { arity: 0 })?;
    let payload_item = items.next().ok_or(NodeCodecError::InvalidArity { arity: 1 })?;

    let compact = path_item
        .as_bytes()
        .ok_or(NodeCodecError::UnexpectedList)?;
    let (nibbles, is_leaf) = Nibbles::from_compact(compact)?;

    if is_leaf {
        let value = into_bytes(payload_item)?;
        Ok(TrieNode::Leaf {
            rest_of_key: nibbles,
            value,
        })
    } else {
        Ok(TrieNode::Extension {
            key_segment: nibbles,
            subnode: decode_child_ref(payload_item)?,
        })
    }
}

fn decode_branch(items: Vec<RlpItem>) -> Result<TrieNode, NodeCodecError> {
    let mut children: Vec<EncodedNode> = Vec::with_capacity(16);
    let mut value = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        if index < 16 {
            children.push(decode_child_ref(item)?);
        } else {
            value = into_bytes(item)?;
        }
    }

    let subnodes: Box<[EncodedNode; 16]> = children
        .try_into()
        .map_err(|_| NodeCodecError::InvalidArity { arity: 17 })?;
    Ok(TrieNode::Branch { subnodes, value })
}

fn decode_child_ref(item: RlpItem) -> Result<EncodedNode, NodeCodecError> {
    match item {
        RlpItem::Bytes(bytes) if bytes.is_empty() => Ok(EncodedNode::Empty),
        RlpItem::Bytes(bytes) if bytes.len() == 32 => {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&bytes);
            Ok(EncodedNode::Hash(hash))
        }
        RlpItem::Bytes(bytes) => Err(NodeCodecError::InvalidChildRef { len: bytes.len() }),
        list @ RlpItem::List(_) => Ok(EncodedNode::Raw(list)),
    }
}

fn into_bytes(item: RlpItem) -> Result<Vec<u8>, NodeCodecError> {
    match item {
        RlpItem::Bytes(bytes) => Ok(bytes),
        RlpItem::List(_) => Err(NodeCodecError::UnexpectedList),
    }
}
