//! Index file lifecycle and the public operation surface.
//!
//! An index file is created empty and initialized lazily by the first
//! insert, which appends the metadata page (page 0) and an empty leaf root
//! (page 1). The metadata page records the current root page number and the
//! attribute the index was built over:
//!
//! ```text
//! Offset  Size      Field
//! 0       4         root page number
//! 4       4         attribute name length
//! 8       nameLen   attribute name bytes
//! 8+n     4         attribute type (0 = Int, 1 = Real, 2 = VarChar)
//! 12+n    4         attribute length (max bytes for VarChar)
//! ```
//!
//! Every operation on an initialized file must present an attribute equal to
//! the recorded one; a mismatch is rejected before any tree page is touched.
//! The engine is a plain value: callers construct an [`IndexFile`] per open
//! index and pass it around explicitly. Ownership makes the remaining
//! lifecycle misuse unrepresentable (no operations on a closed handle, no
//! double bind, no close while a scan borrows the handle).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use log::debug;

use crate::btree::{self, BTree, Scan, NO_NEXT_LEAF, ROOT_PARENT};
use crate::error::{Error, Result};
use crate::key::{Attribute, Key, KeyType};
use crate::rid::Rid;
use crate::storage::{Counters, PagedFile, PAGE_SIZE};

/// Page number of the metadata page.
pub(crate) const META_PAGE: u32 = 0;

/// One open index file.
#[derive(Debug)]
pub struct IndexFile {
    file: PagedFile,
}

impl IndexFile {
    /// Creates a new, empty index file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map(drop)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => Error::FileExists(path.to_path_buf()),
                _ => Error::OpenFailed {
                    path: path.to_path_buf(),
                    source: e,
                },
            })
    }

    /// Removes the index file at `path`.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        fs::remove_file(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileDoesNotExist(path.to_path_buf()),
            _ => Error::RemoveFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })
    }

    /// Opens the index file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<IndexFile> {
        Ok(IndexFile {
            file: PagedFile::open(path)?,
        })
    }

    /// Flushes the file to stable storage and releases the handle.
    pub fn close(self) -> Result<()> {
        self.file.sync()
    }

    /// Inserts one `(key, rid)` entry. The first insert initializes the
    /// file with the given attribute; every later call must present the
    /// same attribute.
    pub fn insert(&mut self, attribute: &Attribute, key: &Key, rid: Rid) -> Result<()> {
        if key.key_type() != attribute.key_type {
            return Err(Error::AttributeMismatch);
        }
        if self.file.page_count() == 0 {
            self.init_file(attribute)?;
        } else {
            self.check_attribute(attribute)?;
        }
        BTree::new(&mut self.file, attribute.key_type).insert(&key.encode(), rid)
    }

    /// Tombstones the entry equal to `(key, rid)`. Returns
    /// [`Error::EntryNotFound`] if no live match exists.
    pub fn delete(&mut self, attribute: &Attribute, key: &Key, rid: Rid) -> Result<()> {
        if key.key_type() != attribute.key_type {
            return Err(Error::AttributeMismatch);
        }
        if self.file.page_count() == 0 {
            return Err(Error::EntryNotFound);
        }
        self.check_attribute(attribute)?;
        BTree::new(&mut self.file, attribute.key_type).delete(&key.encode(), rid)
    }

    /// Opens a range scan over `[low, high]` with per-bound inclusivity.
    /// `None` leaves that end of the range unbounded.
    pub fn scan(
        &mut self,
        attribute: &Attribute,
        low: Option<&Key>,
        high: Option<&Key>,
        low_inclusive: bool,
        high_inclusive: bool,
    ) -> Result<Scan<'_>> {
        for bound in [low, high].into_iter().flatten() {
            if bound.key_type() != attribute.key_type {
                return Err(Error::AttributeMismatch);
            }
        }
        if self.file.page_count() == 0 {
            return Ok(Scan::empty(&mut self.file, attribute.key_type));
        }
        self.check_attribute(attribute)?;

        let low_bytes = low.map(|k| k.encode());
        Scan::position(
            &mut self.file,
            attribute.key_type,
            low_bytes.as_deref(),
            low_inclusive,
            high.map(|k| k.encode()),
            high_inclusive,
        )
    }

    /// Renders the tree pre-order as JSON for debugging. An attribute
    /// mismatch is reported on the output stream instead of failing.
    pub fn print_btree(&mut self, attribute: &Attribute, out: &mut dyn Write) -> Result<()> {
        if self.file.page_count() == 0 {
            return out.write_all(b"{}\n").map_err(Error::WriteFailed);
        }
        match self.check_attribute(attribute) {
            Ok(()) => BTree::new(&mut self.file, attribute.key_type).print(out),
            Err(Error::AttributeMismatch) => out
                .write_all(b"error: attribute mismatch\n")
                .map_err(Error::WriteFailed),
            Err(e) => Err(e),
        }
    }

    /// Cumulative page reads, writes, and appends through this handle.
    pub fn counters(&self) -> Counters {
        self.file.counters()
    }

    fn init_file(&mut self, attribute: &Attribute) -> Result<()> {
        let meta = Metadata {
            root: 1,
            attribute: attribute.clone(),
        };
        self.file.append_page(&meta.encode())?;

        let mut root = vec![0u8; PAGE_SIZE];
        btree::init_leaf(&mut root, ROOT_PARENT, NO_NEXT_LEAF)?;
        self.file.append_page(&root)?;

        debug!("initialized index file: metadata page 0, leaf root page 1");
        Ok(())
    }

    fn check_attribute(&mut self, attribute: &Attribute) -> Result<()> {
        let mut page = vec![0u8; PAGE_SIZE];
        self.file.read_page(META_PAGE, &mut page)?;
        let meta = Metadata::decode(&page)?;
        if meta.attribute != *attribute {
            return Err(Error::AttributeMismatch);
        }
        Ok(())
    }
}

/// Decoded contents of the metadata page.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Metadata {
    root: u32,
    attribute: Attribute,
}

impl Metadata {
    fn encode(&self) -> Vec<u8> {
        let mut page = vec![0u8; PAGE_SIZE];
        let name = self.attribute.name.as_bytes();

        page[..4].copy_from_slice(&self.root.to_le_bytes());
        page[4..8].copy_from_slice(&(name.len() as u32).to_le_bytes());

        let mut offset = 8;
        page[offset..offset + name.len()].copy_from_slice(name);
        offset += name.len();
        page[offset..offset + 4].copy_from_slice(&(self.attribute.key_type as u32).to_le_bytes());
        offset += 4;
        page[offset..offset + 4].copy_from_slice(&self.attribute.length.to_le_bytes());

        page
    }

    fn decode(page: &[u8]) -> Result<Metadata> {
        let read_u32 = |offset: usize| -> Result<u32> {
            page.get(offset..offset + 4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .ok_or_else(|| Error::Corrupt("metadata page truncated".into()))
        };

        let root = read_u32(0)?;
        let name_len = read_u32(4)? as usize;
        let name_bytes = page
            .get(8..8 + name_len)
            .ok_or_else(|| Error::Corrupt("metadata attribute name truncated".into()))?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| Error::Corrupt("metadata attribute name is not valid UTF-8".into()))?
            .to_owned();
        let key_type = KeyType::from_u32(read_u32(8 + name_len)?)
            .ok_or_else(|| Error::Corrupt("metadata attribute type is unknown".into()))?;
        let length = read_u32(12 + name_len)?;

        Ok(Metadata {
            root,
            attribute: Attribute {
                name,
                key_type,
                length,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn int_attribute() -> Attribute {
        Attribute::new("a", KeyType::Int, 4)
    }

    #[test]
    fn metadata_round_trips_through_page_zero() {
        let meta = Metadata {
            root: 17,
            attribute: Attribute::new("age", KeyType::VarChar, 30),
        };

        let page = meta.encode();
        assert_eq!(page.len(), PAGE_SIZE);
        assert_eq!(Metadata::decode(&page).unwrap(), meta);
    }

    #[test]
    fn create_refuses_an_existing_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dup.ix");

        IndexFile::create(&path).unwrap();
        assert!(matches!(
            IndexFile::create(&path),
            Err(Error::FileExists(_))
        ));
    }

    #[test]
    fn destroy_removes_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.ix");

        IndexFile::create(&path).unwrap();
        IndexFile::destroy(&path).unwrap();

        assert!(matches!(
            IndexFile::open(&path),
            Err(Error::FileDoesNotExist(_))
        ));
        assert!(matches!(
            IndexFile::destroy(&path),
            Err(Error::FileDoesNotExist(_))
        ));
    }

    #[test]
    fn first_insert_initializes_metadata_and_root() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("init.ix");
        IndexFile::create(&path).unwrap();

        let mut index = IndexFile::open(&path).unwrap();
        index
            .insert(&int_attribute(), &Key::Int(1), Rid::new(1, 1))
            .unwrap();

        let counters = index.counters();
        assert_eq!(counters.appends, 2);
        index.close().unwrap();
    }

    #[test]
    fn mismatched_attribute_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("attr.ix");
        IndexFile::create(&path).unwrap();

        let mut index = IndexFile::open(&path).unwrap();
        index
            .insert(&int_attribute(), &Key::Int(1), Rid::new(1, 1))
            .unwrap();

        let other = Attribute::new("b", KeyType::Int, 4);
        assert!(matches!(
            index.insert(&other, &Key::Int(2), Rid::new(1, 2)),
            Err(Error::AttributeMismatch)
        ));
        assert!(matches!(
            index.delete(&other, &Key::Int(1), Rid::new(1, 1)),
            Err(Error::AttributeMismatch)
        ));
        assert!(matches!(
            index.scan(&other, None, None, true, true).err(),
            Some(Error::AttributeMismatch)
        ));
    }

    #[test]
    fn key_of_the_wrong_type_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keytype.ix");
        IndexFile::create(&path).unwrap();

        let mut index = IndexFile::open(&path).unwrap();
        assert!(matches!(
            index.insert(&int_attribute(), &Key::Real(1.0), Rid::new(1, 1)),
            Err(Error::AttributeMismatch)
        ));
    }

    #[test]
    fn delete_on_an_uninitialized_file_reports_not_found() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.ix");
        IndexFile::create(&path).unwrap();

        let mut index = IndexFile::open(&path).unwrap();
        assert!(matches!(
            index.delete(&int_attribute(), &Key::Int(1), Rid::new(1, 1)),
            Err(Error::EntryNotFound)
        ));
    }

    #[test]
    fn print_btree_reports_mismatch_on_the_stream() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("print.ix");
        IndexFile::create(&path).unwrap();

        let mut index = IndexFile::open(&path).unwrap();

        let mut out = Vec::new();
        index.print_btree(&int_attribute(), &mut out).unwrap();
        assert_eq!(out, b"{}\n");

        index
            .insert(&int_attribute(), &Key::Int(5), Rid::new(2, 7))
            .unwrap();

        out.clear();
        index.print_btree(&int_attribute(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"keys\":[\"5:[(2,7)]\"]}\n"
        );

        let other = Attribute::new("zzz", KeyType::Int, 4);
        let mut out = Vec::new();
        index.print_btree(&other, &mut out).unwrap();
        assert_eq!(out, b"error: attribute mismatch\n");
    }
}
