//! The B+-tree engine: descent, insert with split cascade, delete, and the
//! pre-order debug printer.
//!
//! ## Split Algorithm
//!
//! When an entry does not fit in its leaf, the page and the new entry are
//! merged into a scratch buffer of 2·PAGE_SIZE (payload in the first half,
//! slot directory and header anchored to the end of the second), where the
//! ordered insert cannot overflow. The pivot is then chosen by offset
//! median: the first entry whose payload offset reaches PAGE_SIZE/2. The
//! left half keeps everything before the pivot under the old page number;
//! the right half is written to a freshly appended page with its slot
//! offsets rebased to start at zero.
//!
//! A leaf pivot is promoted to the parent *and* retained in the right half,
//! so the promoted key acts as a separator. An internal pivot is promoted
//! only: its child pointer becomes the right half's `P0` and its key is not
//! retained.
//!
//! The promotion cascades: if the parent has room the separator is inserted
//! in place, otherwise the parent splits the same way and the cascade
//! continues with its parent. When the cascade reaches the root, a new root
//! page with two children is appended and the metadata page is repointed.
//!
//! ## Parent Pointers
//!
//! Every node records its parent's page number; the cascade relies on it to
//! walk upward. The engine maintains the pointers by two rules: a page
//! created by a split inherits the parent of the page it split from (correct
//! whenever the separator fits in place), and after an internal split every
//! child adopted by the right half is rewritten to point at it. Splits write
//! the left half, then the right half, then the parent chain; the sequence
//! is not atomic, and crash recovery is out of scope.

use std::io::Write;

use log::debug;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::index::META_PAGE;
use crate::key::{Key, KeyBytes, KeyType};
use crate::rid::{Rid, RID_SIZE};
use crate::storage::{PagedFile, PAGE_SIZE};

use super::branch::{self, BranchPage};
use super::leaf::{self, LeafPage};
use super::node::{self, Slot, CHILD_PTR_SIZE, NO_NEXT_LEAF, ROOT_PARENT, SLOT_SIZE};

/// Scratch for one entry payload: `key ‖ RID` or `key ‖ child pointer`.
type EntryBuf = SmallVec<[u8; 44]>;

/// One tree operation's view of an open index file. Constructed per
/// operation; holds no state beyond the borrow and the key type.
pub(crate) struct BTree<'a> {
    pub(crate) file: &'a mut PagedFile,
    pub(crate) key_type: KeyType,
}

impl<'a> BTree<'a> {
    pub(crate) fn new(file: &'a mut PagedFile, key_type: KeyType) -> Self {
        Self { file, key_type }
    }

    /// Current root page number, read from the metadata page.
    pub(crate) fn root(&mut self) -> Result<u32> {
        let mut page = vec![0u8; PAGE_SIZE];
        self.file.read_page(META_PAGE, &mut page)?;
        Ok(u32::from_le_bytes([page[0], page[1], page[2], page[3]]))
    }

    fn set_root(&mut self, root: u32) -> Result<()> {
        let mut page = vec![0u8; PAGE_SIZE];
        self.file.read_page(META_PAGE, &mut page)?;
        page[..4].copy_from_slice(&root.to_le_bytes());
        self.file.write_page(META_PAGE, &page)
    }

    fn read(&mut self, page_num: u32) -> Result<Vec<u8>> {
        let mut page = vec![0u8; PAGE_SIZE];
        self.file.read_page(page_num, &mut page)?;
        Ok(page)
    }

    /// Descends from the root to the leaf where `key` belongs, returning its
    /// page number and contents. `None` descends the left spine to the
    /// leftmost leaf.
    pub(crate) fn find_leaf(&mut self, key: Option<&[u8]>) -> Result<(u32, Vec<u8>)> {
        let mut current = self.root()?;
        let mut page = vec![0u8; PAGE_SIZE];
        loop {
            self.file.read_page(current, &mut page)?;
            if node::header(&page)?.is_leaf() {
                return Ok((current, page));
            }
            current = BranchPage::from_page(&page)?.find_child(self.key_type, key)?;
        }
    }

    pub(crate) fn insert(&mut self, key: &[u8], rid: Rid) -> Result<()> {
        let (leaf_num, mut page) = self.find_leaf(Some(key))?;

        let mut entry = EntryBuf::new();
        entry.extend_from_slice(key);
        let mut rid_bytes = [0u8; RID_SIZE];
        rid.write_to(&mut rid_bytes);
        entry.extend_from_slice(&rid_bytes);

        if node::header(&page)?.free_space() >= entry.len() + SLOT_SIZE {
            let index = leaf::insert_index(&page, self.key_type, key)?;
            node::insert_entry(&mut page, index, &entry)?;
            self.file.write_page(leaf_num, &page)?;
            return Ok(());
        }

        self.split_leaf(leaf_num, &page, key, &entry)
    }

    pub(crate) fn delete(&mut self, key: &[u8], rid: Rid) -> Result<()> {
        let (leaf_num, mut page) = self.find_leaf(Some(key))?;
        if leaf::tombstone_match(&mut page, self.key_type, key, rid)? {
            self.file.write_page(leaf_num, &page)?;
            Ok(())
        } else {
            Err(Error::EntryNotFound)
        }
    }

    fn split_leaf(&mut self, page_num: u32, page: &[u8], key: &[u8], entry: &[u8]) -> Result<()> {
        let old_hdr = *node::header(page)?;
        let right_num = self.file.append_page(&vec![0u8; PAGE_SIZE])?;

        let mut scratch = make_scratch(page)?;
        let index = leaf::insert_index(&scratch, self.key_type, key)?;
        node::insert_entry(&mut scratch, index, entry)?;

        let (pivot_index, pivot_slot) = find_pivot(&scratch)?;
        let pivot_offset = pivot_slot.offset() as usize;
        let pivot_key_len = pivot_slot.length() as usize - RID_SIZE;
        let mut pivot = KeyBytes::new();
        pivot.extend_from_slice(&scratch[pivot_offset..pivot_offset + pivot_key_len]);

        let scratch_hdr = *node::header(&scratch)?;
        let scratch_count = scratch_hdr.cell_count() as usize;
        let scratch_fs = scratch_hdr.free_start() as usize;

        // Left half keeps the old page number. The promoted pivot stays in
        // the right half: it separates the leaves, it is not removed.
        let mut left = vec![0u8; PAGE_SIZE];
        left[..pivot_offset].copy_from_slice(&scratch[..pivot_offset]);
        for i in 0..pivot_index {
            node::set_slot(&mut left, i, node::slot(&scratch, i)?);
        }
        {
            let hdr = node::header_mut(&mut left)?;
            hdr.set_free_start(pivot_offset as u16);
            hdr.set_cell_count(pivot_index as u16);
            hdr.set_leaf(true);
            hdr.set_next_leaf(right_num as i32);
            hdr.set_parent(old_hdr.parent());
        }

        // Right half starts at payload offset zero; slot offsets rebase.
        let mut right = vec![0u8; PAGE_SIZE];
        right[..scratch_fs - pivot_offset].copy_from_slice(&scratch[pivot_offset..scratch_fs]);
        for i in pivot_index..scratch_count {
            let s = node::slot(&scratch, i)?;
            node::set_slot(
                &mut right,
                i - pivot_index,
                Slot::new(s.offset() - pivot_offset as u16, s.length()),
            );
        }
        {
            let hdr = node::header_mut(&mut right)?;
            hdr.set_free_start((scratch_fs - pivot_offset) as u16);
            hdr.set_cell_count((scratch_count - pivot_index) as u16);
            hdr.set_leaf(true);
            hdr.set_next_leaf(old_hdr.next_leaf());
            hdr.set_parent(old_hdr.parent());
        }

        self.file.write_page(page_num, &left)?;
        self.file.write_page(right_num, &right)?;
        debug!("leaf page {} split; new right sibling {}", page_num, right_num);

        self.ascend(page_num, &pivot, right_num, old_hdr.parent())
    }

    /// Promotes `(pivot, right_child)` into `parent`, splitting ancestors as
    /// needed. `left_child` is the page whose split produced the pivot.
    fn ascend(&mut self, left_child: u32, pivot: &[u8], right_child: u32, parent: i32) -> Result<()> {
        if parent == ROOT_PARENT {
            let mut root = vec![0u8; PAGE_SIZE];
            branch::init_root(&mut root, left_child, pivot, right_child)?;
            let root_num = self.file.append_page(&root)?;
            self.set_parent(left_child, root_num as i32)?;
            self.set_parent(right_child, root_num as i32)?;
            self.set_root(root_num)?;
            debug!("root grew: new root page {}", root_num);
            return Ok(());
        }

        let parent_num = parent as u32;
        let page = self.read(parent_num)?;
        let old_hdr = *node::header(&page)?;

        let mut entry = EntryBuf::new();
        entry.extend_from_slice(pivot);
        entry.extend_from_slice(&right_child.to_le_bytes());

        if old_hdr.free_space() >= entry.len() + SLOT_SIZE {
            let mut page = page;
            let index = branch::insert_index(&page, self.key_type, pivot)?;
            node::insert_entry(&mut page, index, &entry)?;
            self.file.write_page(parent_num, &page)?;
            // The right sibling inherited its parent pointer from the page
            // it split from, which is exactly this node.
            return Ok(());
        }

        let right_num = self.file.append_page(&vec![0u8; PAGE_SIZE])?;
        let mut scratch = make_scratch(&page)?;
        let index = branch::insert_index(&scratch, self.key_type, pivot)?;
        node::insert_entry(&mut scratch, index, &entry)?;

        let (pivot_index, pivot_slot) = find_pivot(&scratch)?;
        let pivot_offset = pivot_slot.offset() as usize;
        let pivot_entry_len = pivot_slot.length() as usize;
        let pivot_key_len = pivot_entry_len - CHILD_PTR_SIZE;
        let mut new_pivot = KeyBytes::new();
        new_pivot.extend_from_slice(&scratch[pivot_offset..pivot_offset + pivot_key_len]);

        let scratch_hdr = *node::header(&scratch)?;
        let scratch_count = scratch_hdr.cell_count() as usize;
        let scratch_fs = scratch_hdr.free_start() as usize;

        let mut left = vec![0u8; PAGE_SIZE];
        left[..pivot_offset].copy_from_slice(&scratch[..pivot_offset]);
        for i in 0..pivot_index {
            node::set_slot(&mut left, i, node::slot(&scratch, i)?);
        }
        {
            let hdr = node::header_mut(&mut left)?;
            hdr.set_free_start(pivot_offset as u16);
            hdr.set_cell_count(pivot_index as u16);
            hdr.set_leaf(false);
            hdr.set_next_leaf(NO_NEXT_LEAF);
            hdr.set_parent(old_hdr.parent());
        }

        // The internal pivot is promoted without its key: its child pointer
        // becomes the right half's bare P0.
        let mut right = vec![0u8; PAGE_SIZE];
        right[..CHILD_PTR_SIZE]
            .copy_from_slice(&scratch[pivot_offset + pivot_key_len..pivot_offset + pivot_entry_len]);
        node::set_slot(&mut right, 0, Slot::new(0, CHILD_PTR_SIZE as u16));
        let tail_len = scratch_fs - pivot_offset - pivot_entry_len;
        right[CHILD_PTR_SIZE..CHILD_PTR_SIZE + tail_len]
            .copy_from_slice(&scratch[pivot_offset + pivot_entry_len..scratch_fs]);
        for i in pivot_index + 1..scratch_count {
            let s = node::slot(&scratch, i)?;
            let rebased = s.offset() as usize - pivot_offset - pivot_key_len;
            node::set_slot(
                &mut right,
                i - pivot_index,
                Slot::new(rebased as u16, s.length()),
            );
        }
        {
            let hdr = node::header_mut(&mut right)?;
            hdr.set_free_start((scratch_fs - pivot_offset - pivot_key_len) as u16);
            hdr.set_cell_count((scratch_count - pivot_index) as u16);
            hdr.set_leaf(false);
            hdr.set_next_leaf(NO_NEXT_LEAF);
            hdr.set_parent(old_hdr.parent());
        }

        self.file.write_page(parent_num, &left)?;
        self.file.write_page(right_num, &right)?;
        debug!(
            "internal page {} split; new right sibling {}",
            parent_num, right_num
        );

        // Children adopted by the right half point at it again. This covers
        // the child whose split caused this cascade whenever its separator
        // moved right; when it stayed left, its inherited pointer is already
        // correct.
        let adopted = BranchPage::from_page(&right)?.children(self.key_type)?;
        for child in adopted {
            self.set_parent(child, right_num as i32)?;
        }

        self.ascend(parent_num, &new_pivot, right_num, old_hdr.parent())
    }

    fn set_parent(&mut self, child: u32, parent: i32) -> Result<()> {
        let mut page = self.read(child)?;
        node::header_mut(&mut page)?.set_parent(parent);
        self.file.write_page(child, &page)
    }

    /// Renders the tree pre-order as JSON: internal nodes as
    /// `{"keys":[…],"children":[…]}`, leaves as `{"keys":["key:[(page,slot)]",…]}`
    /// with tombstoned entries omitted.
    pub(crate) fn print(&mut self, out: &mut dyn Write) -> Result<()> {
        let root = self.root()?;
        self.print_node(root, out)?;
        emit(out, format_args!("\n"))
    }

    fn print_node(&mut self, page_num: u32, out: &mut dyn Write) -> Result<()> {
        let page = self.read(page_num)?;
        let hdr = *node::header(&page)?;

        if hdr.is_leaf() {
            let leaf = LeafPage::from_page(&page)?;
            emit(out, format_args!("{{\"keys\":["))?;
            let mut first = true;
            for i in 0..hdr.cell_count() as usize {
                let (key_bytes, rid) = leaf.entry_at(self.key_type, i)?;
                if rid.is_tombstone() {
                    continue;
                }
                let key = Key::decode(self.key_type, key_bytes)?;
                if !first {
                    emit(out, format_args!(","))?;
                }
                emit(
                    out,
                    format_args!("\"{}:[({},{})]\"", key, rid.page_num, rid.slot_num),
                )?;
                first = false;
            }
            emit(out, format_args!("]}}"))?;
            return Ok(());
        }

        let branch = BranchPage::from_page(&page)?;
        let count = hdr.cell_count() as usize;
        emit(out, format_args!("{{\"keys\":["))?;
        for i in 1..count {
            let key = Key::decode(self.key_type, branch.key_at(self.key_type, i)?)?;
            if i > 1 {
                emit(out, format_args!(","))?;
            }
            emit(out, format_args!("\"{}\"", key))?;
        }
        emit(out, format_args!("],\"children\":["))?;
        let children = branch.children(self.key_type)?;
        for (i, child) in children.into_iter().enumerate() {
            if i > 0 {
                emit(out, format_args!(","))?;
            }
            self.print_node(child, out)?;
        }
        emit(out, format_args!("]}}"))
    }
}

fn emit(out: &mut dyn Write, args: std::fmt::Arguments<'_>) -> Result<()> {
    out.write_fmt(args).map_err(Error::WriteFailed)
}

/// Copies a full page into a 2·PAGE_SIZE scratch buffer: payload at the
/// front, slot directory and header anchored to the scratch's end so the
/// end-anchored node routines keep working on it.
fn make_scratch(page: &[u8]) -> Result<Vec<u8>> {
    let hdr = node::header(page)?;
    let mut scratch = vec![0u8; 2 * PAGE_SIZE];

    let free_start = hdr.free_start() as usize;
    scratch[..free_start].copy_from_slice(&page[..free_start]);

    let tail = hdr.cell_count() as usize * SLOT_SIZE + node::NODE_HEADER_SIZE;
    let dst = scratch.len() - tail;
    let src = page.len() - tail;
    scratch[dst..].copy_from_slice(&page[src..]);

    Ok(scratch)
}

/// Offset-median pivot selection: the first entry whose payload offset has
/// reached the page midpoint.
fn find_pivot(scratch: &[u8]) -> Result<(usize, Slot)> {
    let count = node::header(scratch)?.cell_count() as usize;
    for i in 0..count {
        let s = node::slot(scratch, i)?;
        if s.offset() as usize >= PAGE_SIZE / 2 {
            return Ok((i, s));
        }
    }
    Err(Error::Corrupt(
        "no split pivot: entries never reach the page midpoint".into(),
    ))
}
