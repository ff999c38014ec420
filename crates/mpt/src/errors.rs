//! # Trie Error Types
//!
//! One error enum per layer. Each layer wraps the lower-layer cause rather
//! than discarding it, so a failed root computation can be traced back to
//! the nibble, RLP, or hashing problem that produced it.

use thiserror::Error;

/// Errors from nibble handling and the hex-prefix compact encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NibbleError {
    /// A nibble list element exceeds 0x0f.
    #[error("invalid nibble value {value:#04x}: nibble lists hold one 4-bit value per byte")]
    InvalidNibble {
        /// The offending element.
        value: u8,
    },

    /// A compact path was empty; the encoding always has a flag byte.
    #[error("compact path is empty")]
    EmptyCompact,

    /// The top two bits of the compact flag byte were set.
    #[error("invalid compact flag byte {first:#04x}: top two bits must be clear")]
    InvalidFlagBits {
        /// The first byte of the compact input.
        first: u8,
    },

    /// An even-parity compact path carried a non-zero padding nibble.
    #[error("invalid compact padding in {first:#04x}: even paths pad the flag byte with zero")]
    InvalidPadding {
        /// The first byte of the compact input.
        first: u8,
    },
}

/// Errors from decoding RLP bytes.
///
/// Encoding is total and cannot fail; only the decode path produces these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RlpError {
    /// The input ended before the announced item did.
    #[error("rlp input truncated")]
    Truncated,

    /// A long-form length had a leading zero byte or encoded a short payload.
    #[error("rlp length is not canonical")]
    NonCanonicalLength,

    /// A length did not fit in this platform's usize.
    #[error("rlp length overflows usize")]
    LengthOverflow,
}

/// Errors from structurally encoding a node for hashing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrieHashError {
    /// A node path failed hex-prefix encoding.
    #[error("node path failed hex-prefix encoding")]
    Nibble(#[from] NibbleError),
}

/// Errors from decoding an RLP-encoded trie node.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeCodecError {
    /// The node bytes were not valid RLP.
    #[error("node bytes are not valid rlp")]
    Rlp(#[from] RlpError),

    /// The node decoded to a byte string instead of a list.
    #[error("node rlp must be a list")]
    InvalidTopLevel,

    /// Bytes remained after the top-level item.
    #[error("{remaining} trailing bytes after node rlp")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        remaining: usize,
    },

    /// The node list held neither 2 nor 17 items.
    #[error("node list has {arity} items, expected 2 or 17")]
    InvalidArity {
        /// The observed item count.
        arity: usize,
    },

    /// The node path failed hex-prefix decoding.
    #[error("node path failed hex-prefix decoding")]
    Nibble(#[from] NibbleError),

    /// A list appeared where a byte string was required.
    #[error("expected a byte string item, found a list")]
    UnexpectedList,

    /// A child reference byte string was neither empty nor 32 bytes.
    #[error("child reference is {len} bytes, expected 0 or 32")]
    InvalidChildRef {
        /// The observed reference length.
        len: usize,
    },
}

/// Errors from the patricialize tree builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatricializeError {
    /// A key was shorter than the depth already consumed.
    #[error("key of {key_len} nibbles is shorter than level {level}")]
    KeyTooShort {
        /// Length of the offending key in nibbles.
        key_len: usize,
        /// The depth at which it was encountered.
        level: usize,
    },

    /// A key element exceeded 0x0f at a branch point.
    #[error("invalid nibble value {value:#04x} in key")]
    InvalidNibble {
        /// The offending element.
        value: u8,
    },
}

/// Errors from computing a trie root.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrieRootError {
    /// Building the canonical tree failed.
    #[error("patricialize failed")]
    Patricialize(#[from] PatricializeError),

    /// Hashing a built node failed.
    #[error("node hashing failed")]
    Hash(#[from] TrieHashError),
}

/// Errors surfaced by the in-memory trie facade.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrieError {
    /// Root computation over the stored entries failed.
    #[error("root computation failed")]
    Root(#[from] TrieRootError),
}
