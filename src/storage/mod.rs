//! # Storage Module
//!
//! Fixed-size paged file access for index files. The engine owns one
//! [`PagedFile`] per open index and performs all I/O through it as whole-page
//! reads, writes, and appends.
//!
//! ## File Format
//!
//! An index file is a sequence of `PAGE_SIZE`-byte pages, little-endian
//! throughout:
//!
//! ```text
//! Offset 0:      Page 0 (metadata: root pointer + attribute descriptor)
//! Offset 4096:   Page 1 (tree node)
//! Offset 8192:   Page 2 (tree node)
//! ...
//! ```
//!
//! Page N lives at byte offset `N * PAGE_SIZE` and the file size is always a
//! multiple of `PAGE_SIZE`. `PAGE_SIZE` is a deployment constant; changing it
//! is not compatible with existing files.
//!
//! ## Counters
//!
//! Each handle tracks cumulative reads, writes, and appends since open. The
//! counters exist for workload inspection and tests; they carry no
//! correctness weight.
//!
//! ## Thread Safety
//!
//! `PagedFile` is single-threaded. One writer at a time per underlying file,
//! and no readers during a writer; opening the same file through two handles
//! concurrently is undefined.

mod paged_file;

pub use paged_file::{Counters, PagedFile};

/// Size of every page in an index file.
pub const PAGE_SIZE: usize = 4096;
