//! # Larch — Disk-Resident B+-Tree Index Engine
//!
//! Larch maps a typed key (signed 32-bit integer, IEEE-754 32-bit float, or
//! length-prefixed byte string) to record identifiers — `(page, slot)` pairs
//! owned by a higher relational layer. It provides persistent create, open,
//! and close of index files, point insert and delete of `(key, RID)`
//! entries, and range scans producing `(key, RID)` tuples in ascending key
//! order.
//!
//! ## Quick Start
//!
//! ```ignore
//! use larch::{Attribute, IndexFile, Key, KeyType, Rid};
//!
//! IndexFile::create("ages.ix")?;
//! let mut index = IndexFile::open("ages.ix")?;
//!
//! let attr = Attribute::new("age", KeyType::Int, 4);
//! index.insert(&attr, &Key::Int(42), Rid::new(7, 3))?;
//!
//! let mut scan = index.scan(&attr, Some(&Key::Int(0)), None, true, true)?;
//! while let Some((key, rid)) = scan.next_entry()? {
//!     println!("{key} -> ({}, {})", rid.page_num, rid.slot_num);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │       Public API (IndexFile)        │  lifecycle, metadata, validation
//! ├─────────────────────────────────────┤
//! │     B+-Tree Engine (btree)          │  descent, splits, scans, deletes
//! ├─────────────────────────────────────┤
//! │     Key Codec (key) / RIDs (rid)    │  on-page encoding + comparison
//! ├─────────────────────────────────────┤
//! │     Paged File (storage)            │  whole-page read/write/append
//! └─────────────────────────────────────┘
//! ```
//!
//! An index file is a sequence of 4 KiB pages: page 0 records the root page
//! number and the indexed attribute; every other page is a tree node in a
//! slotted layout with the header at the page's end. All data lives in leaf
//! nodes, which are singly linked in key order so scans stream through
//! siblings without revisiting internal nodes.
//!
//! ## Semantics Worth Knowing
//!
//! - Duplicate keys are allowed; inserts are stable with respect to
//!   position.
//! - Deletes are logical tombstones: the RID is overwritten with `(-1, -1)`,
//!   the key keeps its slot, and scans skip it. Space is never reclaimed.
//! - The engine is single-writer, single-threaded per file. Multi-page
//!   operations (splits) are not atomic; crash recovery is out of scope.
//! - A scan mutably borrows the open index, so the handle cannot be closed
//!   or mutated underneath a live iterator.

pub mod btree;
pub mod error;
pub mod key;
pub mod rid;
pub mod storage;

mod index;

pub use btree::Scan;
pub use error::{Error, Result};
pub use index::IndexFile;
pub use key::{Attribute, Key, KeyType};
pub use rid::{Rid, RID_SIZE};
pub use storage::{Counters, PAGE_SIZE};
