//! Internal node operations.
//!
//! Slot 0 of an internal node is a bare 4-byte child pointer `P0` with no
//! key. Slots 1..N−1 hold `key ‖ child-pointer` entries: keys in subtree
//! `P0` are strictly less than slot 1's key, and keys in slot *i*'s subtree
//! are `>=` slot *i*'s key and `<` slot *i+1*'s key. Descent therefore takes
//! the last child whose separator is not strictly greater than the search
//! key, which sends equal keys to the rightmost subtree where they may
//! appear.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::key::{self, KeyType};
use crate::storage::PAGE_SIZE;

use super::node::{self, Slot, CHILD_PTR_SIZE, NO_NEXT_LEAF, ROOT_PARENT};

/// Read-only view of one internal page.
#[derive(Debug)]
pub struct BranchPage<'a> {
    data: &'a [u8],
}

impl<'a> BranchPage<'a> {
    pub fn from_page(data: &'a [u8]) -> Result<Self> {
        if data.len() != PAGE_SIZE {
            return Err(Error::Corrupt(format!(
                "internal page has size {} instead of {}",
                data.len(),
                PAGE_SIZE
            )));
        }
        let hdr = node::header(data)?;
        if hdr.is_leaf() {
            return Err(Error::Corrupt("expected an internal page".into()));
        }
        if hdr.cell_count() < 2 {
            return Err(Error::Corrupt(format!(
                "internal node holds {} entries; at least P0 and one key required",
                hdr.cell_count()
            )));
        }
        Ok(Self { data })
    }

    pub fn entry_count(&self) -> Result<u16> {
        Ok(node::header(self.data)?.cell_count())
    }

    /// Child page number at slot `index` (`P0` for index 0, the entry's
    /// trailing pointer otherwise).
    pub fn child_at(&self, key_type: KeyType, index: usize) -> Result<u32> {
        let slot = node::slot(self.data, index)?;
        let payload = node::payload(self.data, slot)?;
        let ptr = if index == 0 {
            if payload.len() != CHILD_PTR_SIZE {
                return Err(Error::Corrupt(
                    "internal node slot 0 is not a bare child pointer".into(),
                ));
            }
            payload
        } else {
            key::split_entry(key_type, payload, CHILD_PTR_SIZE)?.1
        };
        Ok(u32::from_le_bytes([ptr[0], ptr[1], ptr[2], ptr[3]]))
    }

    /// Separator key bytes at slot `index` (index must be >= 1).
    pub fn key_at(&self, key_type: KeyType, index: usize) -> Result<&'a [u8]> {
        let slot = node::slot(self.data, index)?;
        let payload = node::payload(self.data, slot)?;
        Ok(key::split_entry(key_type, payload, CHILD_PTR_SIZE)?.0)
    }

    /// Child to descend into for `key`. `None` descends the left spine (the
    /// leftmost-leaf special case used by unbounded scans).
    pub fn find_child(&self, key_type: KeyType, key: Option<&[u8]>) -> Result<u32> {
        let mut child = self.child_at(key_type, 0)?;
        let Some(key) = key else {
            return Ok(child);
        };

        let count = self.entry_count()? as usize;
        for i in 1..count {
            let separator = self.key_at(key_type, i)?;
            if key::compare(key_type, separator, key) == Ordering::Greater {
                break;
            }
            child = self.child_at(key_type, i)?;
        }
        Ok(child)
    }

    /// All child page numbers, in slot order.
    pub fn children(&self, key_type: KeyType) -> Result<Vec<u32>> {
        let count = self.entry_count()? as usize;
        (0..count).map(|i| self.child_at(key_type, i)).collect()
    }
}

/// Index of the first separator strictly greater than `key`, or the entry
/// count if none is. Slot 0 holds no key and is skipped.
///
/// End-anchored: works on a real page and on the split scratch.
pub(crate) fn insert_index(data: &[u8], key_type: KeyType, key: &[u8]) -> Result<usize> {
    let count = node::header(data)?.cell_count() as usize;
    for i in 1..count {
        let slot = node::slot(data, i)?;
        let payload = node::payload(data, slot)?;
        let (entry_key, _) = key::split_entry(key_type, payload, CHILD_PTR_SIZE)?;
        if key::compare(key_type, entry_key, key) == Ordering::Greater {
            return Ok(i);
        }
    }
    Ok(count)
}

/// Initializes `data` as a fresh root: `P0 = left` and one separator entry
/// `(pivot, right)`. Used when a split reaches the top of the tree.
pub(crate) fn init_root(data: &mut [u8], left: u32, pivot: &[u8], right: u32) -> Result<()> {
    data.fill(0);

    data[..CHILD_PTR_SIZE].copy_from_slice(&left.to_le_bytes());
    node::set_slot(data, 0, Slot::new(0, CHILD_PTR_SIZE as u16));

    let key_len = pivot.len();
    let entry_start = CHILD_PTR_SIZE;
    data[entry_start..entry_start + key_len].copy_from_slice(pivot);
    data[entry_start + key_len..entry_start + key_len + CHILD_PTR_SIZE]
        .copy_from_slice(&right.to_le_bytes());
    node::set_slot(
        data,
        1,
        Slot::new(entry_start as u16, (key_len + CHILD_PTR_SIZE) as u16),
    );

    let hdr = node::header_mut(data)?;
    hdr.set_free_start((entry_start + key_len + CHILD_PTR_SIZE) as u16);
    hdr.set_cell_count(2);
    hdr.set_leaf(false);
    hdr.set_next_leaf(NO_NEXT_LEAF);
    hdr.set_parent(ROOT_PARENT);
    Ok(())
}
