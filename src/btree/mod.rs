//! # B+-Tree Index Structure
//!
//! This module implements the on-disk B+-tree backing every index file. All
//! entries live in leaf nodes; internal nodes hold separator keys and child
//! page pointers; leaves are singly linked in key order for range scans.
//!
//! ## Node Page Layout
//!
//! Every tree node occupies one `PAGE_SIZE` page with a slotted layout whose
//! directory and header sit at the *end* of the page:
//!
//! ```text
//! +----------------------------------+  offset 0
//! | Payload region (grows upward)    |
//! |   leaf:     K0|RID0|K1|RID1|...  |
//! |   internal: P0|K1|P1|K2|P2|...   |
//! +----------------------------------+  offset FS
//! | Free space                       |
//! +----------------------------------+
//! | Slot directory (grows downward)  |  slot i = (offset, length)
//! +----------------------------------+
//! | NodeHeader: FS|N|leaf|next|parent|  last 13 bytes
//! +----------------------------------+  offset PAGE_SIZE
//! ```
//!
//! Leaf entry payloads are `key ‖ RID`; internal slot 0 is a bare child
//! pointer `P0`, and internal slots 1..N−1 are `key ‖ child pointer`.
//!
//! ## Ordering
//!
//! Entries are stored in ascending key order. Duplicate keys are allowed in
//! leaves; a new entry goes before the first strictly-greater key. Descent
//! uses strict greater-than against separators, so equal keys are found in
//! the rightmost subtree where they may appear.
//!
//! ## Splits
//!
//! A full node splits at the offset median (the first entry whose payload
//! offset reaches PAGE_SIZE/2) via a double-size scratch buffer; see
//! [`tree`] for the cascade that carries the pivot up through the ancestors
//! and grows a new root when it reaches the top.
//!
//! ## Deletes
//!
//! Deletes are logical: the entry's RID is overwritten with `(-1, -1)` and
//! the space is never reclaimed. Scans skip tombstones.

mod branch;
mod leaf;
mod node;
mod scan;
mod tree;

pub use branch::BranchPage;
pub use leaf::LeafPage;
pub use node::{
    header, validate_node, NodeHeader, Slot, CHILD_PTR_SIZE, NODE_HEADER_SIZE, NO_NEXT_LEAF,
    ROOT_PARENT, SLOT_SIZE,
};
pub use scan::Scan;

pub(crate) use node::init_leaf;
pub(crate) use tree::BTree;
