//! Leaf node operations.
//!
//! A leaf entry's payload is `key ‖ RID`. Entries are kept in ascending key
//! order; duplicate keys are allowed, and a new entry always lands before the
//! first strictly-greater key, so insertion is stable with respect to
//! position. Deletion never moves bytes: the entry's RID is overwritten with
//! the tombstone sentinel and the key stays on the page.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::key::{self, KeyType};
use crate::rid::{Rid, RID_SIZE};
use crate::storage::PAGE_SIZE;

use super::node;

/// Read-only view of one leaf page.
#[derive(Debug)]
pub struct LeafPage<'a> {
    data: &'a [u8],
}

impl<'a> LeafPage<'a> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        if data.len() != PAGE_SIZE {
            return Err(Error::Corrupt(format!(
                "leaf page has size {} instead of {}",
                data.len(),
                PAGE_SIZE
            )));
        }
        if !node::header(data)?.is_leaf() {
            return Err(Error::Corrupt("expected a leaf page".into()));
        }
        Ok(Self { data })
    }

    pub fn entry_count(&self) -> Result<u16> {
        Ok(node::header(self.data)?.cell_count())
    }

    pub fn next_leaf(&self) -> Result<i32> {
        Ok(node::header(self.data)?.next_leaf())
    }

    /// Returns the key bytes and RID of entry `index`.
    pub fn entry_at(&self, key_type: KeyType, index: usize) -> Result<(&'a [u8], Rid)> {
        let slot = node::slot(self.data, index)?;
        let payload = node::payload(self.data, slot)?;
        let (key_bytes, rid_bytes) = key::split_entry(key_type, payload, RID_SIZE)?;
        Ok((key_bytes, Rid::read_from(rid_bytes)))
    }
}

/// Index of the first entry whose key is strictly greater than `key`, or the
/// entry count if none is. This is where a new `(key, RID)` entry belongs.
///
/// End-anchored: works on a real page and on the split scratch.
pub(crate) fn insert_index(data: &[u8], key_type: KeyType, key: &[u8]) -> Result<usize> {
    let count = node::header(data)?.cell_count() as usize;
    for i in 0..count {
        let slot = node::slot(data, i)?;
        let payload = node::payload(data, slot)?;
        let (entry_key, _) = key::split_entry(key_type, payload, RID_SIZE)?;
        if key::compare(key_type, entry_key, key) == Ordering::Greater {
            return Ok(i);
        }
    }
    Ok(count)
}

/// Index of the first entry satisfying the low scan bound: `key >= low` when
/// inclusive, `key > low` otherwise. Entries before it are out of range.
pub(crate) fn lower_bound(
    data: &[u8],
    key_type: KeyType,
    low: &[u8],
    inclusive: bool,
) -> Result<usize> {
    let count = node::header(data)?.cell_count() as usize;
    for i in 0..count {
        let slot = node::slot(data, i)?;
        let payload = node::payload(data, slot)?;
        let (entry_key, _) = key::split_entry(key_type, payload, RID_SIZE)?;
        match key::compare(key_type, entry_key, low) {
            Ordering::Greater => return Ok(i),
            Ordering::Equal if inclusive => return Ok(i),
            _ => {}
        }
    }
    Ok(count)
}

/// Tombstones the first live entry equal to `(key, rid)`, returning `true` if
/// one was found. The RID bytes are overwritten in place with `(-1, -1)`.
pub(crate) fn tombstone_match(
    data: &mut [u8],
    key_type: KeyType,
    key: &[u8],
    rid: Rid,
) -> Result<bool> {
    let count = node::header(data)?.cell_count() as usize;
    for i in 0..count {
        let slot = node::slot(data, i)?;
        let key_len = {
            let payload = node::payload(data, slot)?;
            let (entry_key, rid_bytes) = key::split_entry(key_type, payload, RID_SIZE)?;
            if key::compare(key_type, entry_key, key) != Ordering::Equal {
                continue;
            }
            let current = Rid::read_from(rid_bytes);
            if current != rid || current.is_tombstone() {
                continue;
            }
            entry_key.len()
        };
        let rid_offset = slot.offset() as usize + key_len;
        Rid::TOMBSTONE.write_to(&mut data[rid_offset..rid_offset + RID_SIZE]);
        return Ok(true);
    }
    Ok(false)
}
