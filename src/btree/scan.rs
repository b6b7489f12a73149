//! Range scans over the leaf sibling chain.
//!
//! A scan positions once via the tree descent (or the left spine when there
//! is no low bound) and then streams entries straight from the leaf chain,
//! never touching internal nodes again. The iterator owns a private page
//! buffer and mutably borrows the open index, so the handle cannot be closed
//! or mutated while a scan is live; dropping the scan releases the borrow
//! and the buffer.

use crate::error::Result;
use crate::key::{self, Key, KeyBytes, KeyType};
use crate::rid::{Rid, RID_SIZE};
use crate::storage::{PagedFile, PAGE_SIZE};

use super::leaf;
use super::node;
use super::tree::BTree;

/// Streaming cursor over the entries of one key range, in ascending key
/// order. Tombstoned entries are skipped.
pub struct Scan<'a> {
    file: &'a mut PagedFile,
    key_type: KeyType,
    high: Option<KeyBytes>,
    high_inclusive: bool,
    page: Vec<u8>,
    cursor: usize,
    exhausted: bool,
}

impl<'a> Scan<'a> {
    /// A scan over a file with no pages yet: immediately exhausted.
    pub(crate) fn empty(file: &'a mut PagedFile, key_type: KeyType) -> Self {
        Self {
            file,
            key_type,
            high: None,
            high_inclusive: true,
            page: vec![0u8; PAGE_SIZE],
            cursor: 0,
            exhausted: true,
        }
    }

    /// Positions a new scan at the first entry satisfying the low bound.
    pub(crate) fn position(
        file: &'a mut PagedFile,
        key_type: KeyType,
        low: Option<&[u8]>,
        low_inclusive: bool,
        high: Option<KeyBytes>,
        high_inclusive: bool,
    ) -> Result<Self> {
        let mut tree = BTree::new(file, key_type);
        let (_, page) = tree.find_leaf(low)?;
        let cursor = match low {
            Some(low) => leaf::lower_bound(&page, key_type, low, low_inclusive)?,
            None => 0,
        };
        Ok(Self {
            file: tree.file,
            key_type,
            high,
            high_inclusive,
            page,
            cursor,
            exhausted: false,
        })
    }

    /// Next in-range live entry, or `Ok(None)` once the scan is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<(Key, Rid)>> {
        if self.exhausted {
            return Ok(None);
        }

        loop {
            let hdr = *node::header(&self.page)?;
            if self.cursor >= hdr.cell_count() as usize {
                let next = hdr.next_leaf();
                if next == node::NO_NEXT_LEAF {
                    self.exhausted = true;
                    return Ok(None);
                }
                self.file.read_page(next as u32, &mut self.page)?;
                self.cursor = 0;
                continue;
            }

            let slot = node::slot(&self.page, self.cursor)?;
            self.cursor += 1;

            let payload = node::payload(&self.page, slot)?;
            let (key_bytes, rid_bytes) = key::split_entry(self.key_type, payload, RID_SIZE)?;
            let rid = Rid::read_from(rid_bytes);
            if rid.is_tombstone() {
                continue;
            }

            if let Some(high) = &self.high {
                let ord = key::compare(self.key_type, key_bytes, high);
                if ord == std::cmp::Ordering::Greater
                    || (!self.high_inclusive && ord == std::cmp::Ordering::Equal)
                {
                    self.exhausted = true;
                    return Ok(None);
                }
            }

            let key = Key::decode(self.key_type, key_bytes)?;
            return Ok(Some((key, rid)));
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<(Key, Rid)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
