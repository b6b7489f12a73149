//! Typed keys and their on-disk codec.
//!
//! The index orders entries by one attribute whose value is a signed 32-bit
//! integer, an IEEE-754 32-bit float, or a length-prefixed byte string. A key
//! is modeled as the [`Key`] sum type and serialized to its on-page binary
//! form at the page boundary:
//!
//! ```text
//! Int      4 bytes, signed little-endian
//! Real     4 bytes, IEEE-754 little-endian
//! VarChar  4-byte length L, then L bytes (no terminator on disk)
//! ```
//!
//! Comparison runs directly on the on-disk encoding so the search, insert,
//! and scan hot paths never allocate or decode. `VarChar` compares
//! lexicographically byte by byte up to the shorter length, then by length,
//! which is exactly slice ordering on the string bytes.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Scratch buffer for one encoded key. Int and Real keys (4 bytes) and short
/// VarChar keys stay on the stack.
pub(crate) type KeyBytes = SmallVec<[u8; 36]>;

/// The three key encodings the engine understands.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Int = 0,
    Real = 1,
    VarChar = 2,
}

impl KeyType {
    pub(crate) fn from_u32(v: u32) -> Option<KeyType> {
        match v {
            0 => Some(KeyType::Int),
            1 => Some(KeyType::Real),
            2 => Some(KeyType::VarChar),
            _ => None,
        }
    }
}

/// Descriptor of the attribute an index is built over.
///
/// The descriptor is recorded in the metadata page when the file is
/// initialized; every later operation must present an equal descriptor or it
/// is rejected with [`Error::AttributeMismatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub key_type: KeyType,
    /// Maximum value size in bytes for `VarChar`; ignored for the fixed-width
    /// types.
    pub length: u32,
}

impl Attribute {
    pub fn new(name: impl Into<String>, key_type: KeyType, length: u32) -> Self {
        Self {
            name: name.into(),
            key_type,
            length,
        }
    }
}

/// One key value.
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Int(i32),
    Real(f32),
    VarChar(String),
}

impl Key {
    pub fn key_type(&self) -> KeyType {
        match self {
            Key::Int(_) => KeyType::Int,
            Key::Real(_) => KeyType::Real,
            Key::VarChar(_) => KeyType::VarChar,
        }
    }

    /// Serializes the key to its on-page form.
    pub(crate) fn encode(&self) -> KeyBytes {
        let mut buf = KeyBytes::new();
        match self {
            Key::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Key::Real(v) => buf.extend_from_slice(&v.to_le_bytes()),
            Key::VarChar(s) => {
                buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
        }
        buf
    }

    /// Decodes a key of the given type from exactly its encoded bytes.
    pub(crate) fn decode(key_type: KeyType, bytes: &[u8]) -> Result<Key> {
        match key_type {
            KeyType::Int => {
                if bytes.len() < 4 {
                    return Err(Error::Corrupt("truncated Int key".into()));
                }
                Ok(Key::Int(i32::from_le_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3],
                ])))
            }
            KeyType::Real => {
                if bytes.len() < 4 {
                    return Err(Error::Corrupt("truncated Real key".into()));
                }
                Ok(Key::Real(f32::from_le_bytes([
                    bytes[0], bytes[1], bytes[2], bytes[3],
                ])))
            }
            KeyType::VarChar => {
                let len = varchar_len(bytes)
                    .ok_or_else(|| Error::Corrupt("truncated VarChar key".into()))?;
                let text = std::str::from_utf8(&bytes[4..4 + len])
                    .map_err(|_| Error::Corrupt("VarChar key is not valid UTF-8".into()))?;
                Ok(Key::VarChar(text.to_owned()))
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Real(v) => write!(f, "{}", v),
            Key::VarChar(s) => write!(f, "{}", s),
        }
    }
}

fn varchar_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < 4 {
        return None;
    }
    let len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if bytes.len() < 4 + len {
        return None;
    }
    Some(len)
}

/// Bytes consumed by one encoded key at the start of `bytes`, or `None` if
/// the buffer is too short to hold it.
pub(crate) fn encoded_len(key_type: KeyType, bytes: &[u8]) -> Option<usize> {
    match key_type {
        KeyType::Int | KeyType::Real => (bytes.len() >= 4).then_some(4),
        KeyType::VarChar => varchar_len(bytes).map(|l| 4 + l),
    }
}

/// Splits an entry payload into its key bytes and its fixed-width trailer
/// (RID in leaves, child pointer in internal nodes), validating that the
/// payload is exactly `key ‖ trailer`.
pub(crate) fn split_entry(
    key_type: KeyType,
    payload: &[u8],
    trailer: usize,
) -> Result<(&[u8], &[u8])> {
    let key_len = encoded_len(key_type, payload)
        .ok_or_else(|| Error::Corrupt("entry payload too short for its key".into()))?;
    if payload.len() != key_len + trailer {
        return Err(Error::Corrupt(format!(
            "entry payload length {} does not match key {} + trailer {}",
            payload.len(),
            key_len,
            trailer
        )));
    }
    Ok(payload.split_at(key_len))
}

/// Compares two encoded keys of the same type.
///
/// Both operands must begin with a well-formed encoding; page accessors
/// validate entries with [`split_entry`] before comparing, and search keys
/// come from [`Key::encode`]. Only the key prefix of each operand is read,
/// so an entry payload (`key ‖ trailer`) may be passed directly.
pub(crate) fn compare(key_type: KeyType, a: &[u8], b: &[u8]) -> Ordering {
    match key_type {
        KeyType::Int => {
            let x = i32::from_le_bytes([a[0], a[1], a[2], a[3]]);
            let y = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            x.cmp(&y)
        }
        KeyType::Real => {
            let x = f32::from_le_bytes([a[0], a[1], a[2], a[3]]);
            let y = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            // NaN never occurs in a well-formed index; treat it as equal so
            // the ordering stays total.
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        KeyType::VarChar => {
            let la = u32::from_le_bytes([a[0], a[1], a[2], a[3]]) as usize;
            let lb = u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize;
            a[4..4 + la].cmp(&b[4..4 + lb])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_key_round_trips() {
        let key = Key::Int(-42);
        let encoded = key.encode();

        assert_eq!(encoded.len(), 4);
        assert_eq!(Key::decode(KeyType::Int, &encoded).unwrap(), key);
    }

    #[test]
    fn real_key_round_trips() {
        let key = Key::Real(3.5);
        let encoded = key.encode();

        assert_eq!(Key::decode(KeyType::Real, &encoded).unwrap(), key);
    }

    #[test]
    fn varchar_key_round_trips() {
        let key = Key::VarChar("banana".into());
        let encoded = key.encode();

        assert_eq!(encoded.len(), 10);
        assert_eq!(&encoded[..4], &6u32.to_le_bytes());
        assert_eq!(Key::decode(KeyType::VarChar, &encoded).unwrap(), key);
    }

    #[test]
    fn encoded_len_matches_each_type() {
        assert_eq!(encoded_len(KeyType::Int, &[0; 4]), Some(4));
        assert_eq!(encoded_len(KeyType::Real, &[0; 4]), Some(4));

        let encoded = Key::VarChar("apple".into()).encode();
        assert_eq!(encoded_len(KeyType::VarChar, &encoded), Some(9));
    }

    #[test]
    fn encoded_len_rejects_truncation() {
        assert_eq!(encoded_len(KeyType::Int, &[0; 3]), None);
        assert_eq!(encoded_len(KeyType::VarChar, &[5, 0, 0, 0, b'a']), None);
    }

    #[test]
    fn int_compare_uses_signed_order() {
        let neg = Key::Int(-5).encode();
        let pos = Key::Int(3).encode();

        assert_eq!(compare(KeyType::Int, &neg, &pos), Ordering::Less);
        assert_eq!(compare(KeyType::Int, &pos, &neg), Ordering::Greater);
        assert_eq!(compare(KeyType::Int, &pos, &pos), Ordering::Equal);
    }

    #[test]
    fn real_compare_uses_natural_order() {
        let small = Key::Real(-1.25).encode();
        let big = Key::Real(2.0).encode();

        assert_eq!(compare(KeyType::Real, &small, &big), Ordering::Less);
        assert_eq!(compare(KeyType::Real, &big, &small), Ordering::Greater);
    }

    #[test]
    fn varchar_compare_is_lexicographic_then_length() {
        let apple = Key::VarChar("apple".into()).encode();
        let banana = Key::VarChar("banana".into()).encode();
        let app = Key::VarChar("app".into()).encode();

        assert_eq!(compare(KeyType::VarChar, &apple, &banana), Ordering::Less);
        assert_eq!(compare(KeyType::VarChar, &app, &apple), Ordering::Less);
        assert_eq!(compare(KeyType::VarChar, &apple, &apple), Ordering::Equal);
    }

    #[test]
    fn compare_reads_only_the_key_prefix_of_a_payload() {
        // Entry payload = key ‖ RID; the RID bytes must not affect ordering.
        let mut payload = Key::Int(10).encode().to_vec();
        payload.extend_from_slice(&[0xFF; 8]);
        let probe = Key::Int(10).encode();

        assert_eq!(compare(KeyType::Int, &payload, &probe), Ordering::Equal);
    }

    #[test]
    fn split_entry_validates_exact_length() {
        let mut payload = Key::VarChar("kiwi".into()).encode().to_vec();
        payload.extend_from_slice(&[1, 0, 0, 0, 2, 0, 0, 0]);

        let (key, trailer) = split_entry(KeyType::VarChar, &payload, 8).unwrap();
        assert_eq!(key, &Key::VarChar("kiwi".into()).encode()[..]);
        assert_eq!(trailer.len(), 8);

        assert!(split_entry(KeyType::VarChar, &payload, 4).is_err());
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let mut encoded = vec![2u32.to_le_bytes().to_vec(), vec![0xFF, 0xFE]].concat();
        assert!(Key::decode(KeyType::VarChar, &encoded).is_err());
        encoded.truncate(3);
        assert!(Key::decode(KeyType::VarChar, &encoded).is_err());
    }
}
