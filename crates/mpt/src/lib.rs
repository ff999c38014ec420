//! # mpt: Modified Merkle Patricia Trie core
//!
//! The trie structure used for Ethereum-style state commitments.
//!
//! ## Components
//!
//! - `nibbles` - Nibble paths and the hex-prefix compact encoding
//! - `rlp` - Canonical RLP item codec and Keccak256
//! - `node` - Leaf / extension / branch node model and the structural hasher
//! - `codec` - Decoding RLP-encoded nodes back into their structural form
//! - `trie` - Root computation (patricialize) and the in-memory trie facade
//! - `errors` - Error types, one per layer
//!
//! ## Invariants
//!
//! - A branch node always has exactly 16 child slots plus a value.
//! - An extension node's key segment is never empty.
//! - A node is inlined into its parent when its RLP encoding is shorter
//!   than 32 bytes, and replaced by its Keccak256 hash otherwise.
//! - The root of a trie depends only on its key/value bindings, never on
//!   insertion order.

#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod nibbles;
pub mod node;
pub mod rlp;
pub mod trie;

pub use codec::decode_trie_node;
pub use errors::{
    NibbleError, NodeCodecError, PatricializeError, RlpError, TrieError, TrieHashError,
    TrieRootError,
};
pub use nibbles::Nibbles;
pub use node::{encode_internal_node, EncodedNode, TrieNode};
pub use rlp::{keccak256, rlp_decode, rlp_encode, RlpItem};
pub use trie::{patricialize, trie_root, Trie, TrieConfig};

/// A 32-byte Keccak256 digest.
pub type Hash = [u8; 32];

/// Keccak256 hash of the RLP encoding of empty bytes (`0x80`).
/// This is the canonical root of an empty trie; it is never persisted.
pub const EMPTY_TRIE_ROOT: Hash = [
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
];
