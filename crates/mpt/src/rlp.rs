//! # RLP Codec
//!
//! Canonical Ethereum RLP over a small item model: a byte string or a list
//! of items. Trie nodes are hashed over exactly these bytes, so the encoder
//! follows the canonical rules byte for byte.

use crate::errors::RlpError;
use crate::Hash;
use sha3::{Digest, Keccak256};

/// An RLP item: a byte string or a list of nested items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RlpItem {
    /// A byte string.
    Bytes(Vec<u8>),
    /// A list of items.
    List(Vec<RlpItem>),
}

impl RlpItem {
    /// Borrow the byte payload, or `None` for a list.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RlpItem::Bytes(b) => Some(b),
            RlpItem::List(_) => None,
        }
    }
}

/// RLP-encode an item.
pub fn rlp_encode(item: &RlpItem) -> Vec<u8> {
    match item {
        RlpItem::Bytes(data) => encode_bytes(data),
        RlpItem::List(items) => {
            let mut payload = Vec::new();
            for child in items {
                payload.extend(rlp_encode(child));
            }
            let mut result = Vec::with_capacity(payload.len() + 9);
            if payload.len() < 56 {
                result.push(0xC0 + payload.len() as u8);
            } else {
                let len_bytes = encode_length(payload.len());
                result.push(0xF7 + len_bytes.len() as u8);
                result.extend_from_slice(&len_bytes);
            }
            result.extend(payload);
            result
        }
    }
}

/// RLP-encode a byte slice.
fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        vec![data[0]]
    } else if data.len() < 56 {
        let mut result = vec![0x80 + data.len() as u8];
        result.extend_from_slice(data);
        result
    } else {
        let len_bytes = encode_length(data.len());
        let mut result = vec![0xB7 + len_bytes.len() as u8];
        result.extend_from_slice(&len_bytes);
        result.extend_from_slice(data);
        result
    }
}

/// Encode a length as minimal big-endian bytes.
fn encode_length(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let start = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

/// Decode one RLP item from the front of `buf`.
///
/// Returns the item and the unconsumed remainder. Callers that require the
/// whole input to be a single item must check the remainder is empty.
pub fn rlp_decode(buf: &[u8]) -> Result<(RlpItem, &[u8]), RlpError> {
    let (item, used) = decode_item(buf)?;
    Ok((item, &buf[used..]))
}

/// Decode one item, returning it with the number of bytes consumed.
fn decode_item(buf: &[u8]) -> Result<(RlpItem, usize), RlpError> {
    let first = *buf.first().ok_or(RlpError::Truncated)?;
    match first {
        0x00..=0x7F => Ok((RlpItem::Bytes(vec![first]), 1)),
        0x80..=0xB7 => {
            let len = (first - 0x80) as usize;
            let end = 1 + len;
            if buf.len() < end {
                return Err(RlpError::Truncated);
            }
            Ok((RlpItem::Bytes(buf[1..end].to_vec()), end))
        }
        0xB8..=0xBF => {
            let len_len = (first - 0xB7) as usize;
            let len = read_long_length(&buf[1..], len_len)?;
            let start = 1 + len_len;
            let end = start.checked_add(len).ok_or(RlpError::LengthOverflow)?;
            if buf.len() < end {
                return Err(RlpError::Truncated);
            }
            Ok((RlpItem::Bytes(buf[start..end].to_vec()), end))
        }
        0xC0..=0xF7 => {
            let payload = (first - 0xC0) as usize;
            decode_list(buf, 1, payload)
        }
        0xF8..=0xFF => {
            let len_len = (first - 0xF7) as usize;
            let payload = read_long_length(&buf[1..], len_len)?;
            decode_list(buf, 1 + len_len, payload)
        }
    }
}

/// Decode list items out of `buf[start..start + payload_len]`.
fn decode_list(buf: &[u8], start: usize, payload_len: usize) -> Result<(RlpItem, usize), RlpError> {
    let end = start.checked_add(payload_len).ok_or(RlpError::LengthOverflow)?;
    if buf.len() < end {
        return Err(RlpError::Truncated);
    }

    let mut items = Vec::new();
    let mut offset = start;
    while offset < end {
        let (item, used) = decode_item(&buf[offset..end])?;
        items.push(item);
        offset += used;
    }
    Ok((RlpItem::List(items), end))
}

/// Read a long-form length of `len_len` big-endian bytes.
///
/// Long form is only legal for payloads of 56 bytes or more and must not
/// carry leading zeroes.
fn read_long_length(buf: &[u8], len_len: usize) -> Result<usize, RlpError> {
    if buf.len() < len_len {
        return Err(RlpError::Truncated);
    }
    if len_len > core::mem::size_of::<usize>() {
        return Err(RlpError::LengthOverflow);
    }
    if buf[0] == 0 {
        return Err(RlpError::NonCanonicalLength);
    }

    let mut len = 0usize;
    for &byte in &buf[..len_len] {
        len = (len << 8) | byte as usize;
    }
    if len < 56 {
        return Err(RlpError::NonCanonicalLength);
    }
    Ok(len)
}

/// Compute Keccak256 hash.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}
