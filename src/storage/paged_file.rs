//! Whole-page file I/O with per-handle operation counters.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

use super::PAGE_SIZE;

/// Cumulative page operations performed through one handle since open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub reads: u64,
    pub writes: u64,
    pub appends: u64,
}

/// One open index file, accessed a page at a time.
///
/// Pages are written straight through to the file on every [`write_page`] and
/// [`append_page`], so later reads through the same handle always observe
/// what was written. Durability against power loss is deferred to
/// [`sync`](PagedFile::sync), called when the index is closed.
///
/// [`write_page`]: PagedFile::write_page
/// [`append_page`]: PagedFile::append_page
#[derive(Debug)]
pub struct PagedFile {
    file: File,
    page_count: u32,
    counters: Counters,
}

impl PagedFile {
    /// Opens an existing file. The file size must be a whole number of pages.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::FileDoesNotExist(path.to_path_buf()),
                _ => Error::OpenFailed {
                    path: path.to_path_buf(),
                    source: e,
                },
            })?;

        let len = file
            .metadata()
            .map_err(|e| Error::OpenFailed {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();

        if len % PAGE_SIZE as u64 != 0 {
            return Err(Error::Corrupt(format!(
                "file size {} is not a multiple of page size {}",
                len, PAGE_SIZE
            )));
        }

        Ok(Self {
            file,
            page_count: (len / PAGE_SIZE as u64) as u32,
            counters: Counters::default(),
        })
    }

    /// Reads page `page_num` into `buf`.
    pub fn read_page(&mut self, page_num: u32, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);

        if page_num >= self.page_count {
            return Err(Error::PageDoesNotExist(page_num));
        }

        self.seek_to(page_num)?;
        self.file.read_exact(buf).map_err(Error::ReadFailed)?;

        self.counters.reads += 1;
        Ok(())
    }

    /// Overwrites the existing page `page_num` with `buf`.
    pub fn write_page(&mut self, page_num: u32, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);

        if page_num >= self.page_count {
            return Err(Error::PageDoesNotExist(page_num));
        }

        self.seek_to(page_num)?;
        self.file.write_all(buf).map_err(Error::WriteFailed)?;

        self.counters.writes += 1;
        Ok(())
    }

    /// Grows the file by one page holding `buf` and returns its page number.
    pub fn append_page(&mut self, buf: &[u8]) -> Result<u32> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);

        self.file
            .seek(SeekFrom::End(0))
            .map_err(Error::SeekFailed)?;
        self.file.write_all(buf).map_err(Error::WriteFailed)?;

        let page_num = self.page_count;
        self.page_count += 1;
        self.counters.appends += 1;
        Ok(page_num)
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Forces all written pages to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().map_err(Error::WriteFailed)
    }

    fn seek_to(&mut self, page_num: u32) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(page_num as u64 * PAGE_SIZE as u64))
            .map_err(Error::SeekFailed)?;
        Ok(())
    }
}
