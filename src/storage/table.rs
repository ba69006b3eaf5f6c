use std::fs::File;

use tracing::warn;

use crate::{
    storage::{
        fsm,
        page::{Page, Tuple},
    },
    types::{
        error::{DatabaseError, Result},
        TupleLocation, PAGE_HEADER_SIZE, PAGE_SIZE, TUPLE_POINTER_SIZE,
    },
    util::io,
};

/// Largest tuple a single page can hold alongside its pointer.
pub const MAX_TUPLE_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE - TUPLE_POINTER_SIZE;

/// A table stores tuples of the same shape across multiple pages in a data
/// file, with a companion free-space map file tracking per-page fullness.
///
/// Individual operations never fsync; durability points are exactly
/// `flush` and `close`.
#[derive(Debug)]
pub struct Table {
    file: File,
    fsm: File,
    closed: bool,
}

impl Table {
    pub fn new(data: File, fsm: File) -> Self {
        Self {
            file: data,
            fsm,
            closed: false,
        }
    }

    /// Adds a tuple to the first page that can hold it, allocating a new
    /// page at the end of both files when none can.
    pub fn add(&mut self, tuple: &[u8]) -> Result<()> {
        self.ensure_open()?;
        if tuple.len() > MAX_TUPLE_SIZE {
            return Err(DatabaseError::TupleTooLarge {
                size: tuple.len(),
                max: MAX_TUPLE_SIZE,
            });
        }

        let mut idx = fsm::find_free_page(&self.fsm, tuple.len() as u32)?;
        if idx == -1 {
            idx = self.allocate_new_page()?;
        }

        let mut page = Page::new(&self.file, idx as u64 * PAGE_SIZE as u64);
        let (_, free) = page.add(tuple)?;

        fsm::update(&self.fsm, idx, free)?;
        Ok(())
    }

    /// Scans all pages in order, invoking the iterator for every live
    /// tuple. The iterator decides whether the scan continues; any error
    /// aborts it.
    pub fn scan<F>(&mut self, mut iter: F) -> Result<()>
    where
        F: FnMut(Tuple, TupleLocation) -> Result<bool>,
    {
        self.ensure_open()?;
        let size = self.file.metadata()?.len();
        if size % PAGE_SIZE as u64 != 0 {
            warn!(
                size,
                page_size = PAGE_SIZE,
                "data file size is not a multiple of the page size"
            );
        }
        let page_count = size / PAGE_SIZE as u64;
        for i in 0..page_count {
            let mut page = Page::new(&self.file, i * PAGE_SIZE as u64);
            for (slot, tuple) in page.entries()? {
                let cont = iter(
                    tuple,
                    TupleLocation {
                        page: i as i64,
                        slot,
                    },
                )?;
                if !cont {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Marks the tuple at the given location as deleted.
    pub fn delete(&mut self, loc: TupleLocation) -> Result<()> {
        self.ensure_open()?;
        let page_count = (self.file.metadata()?.len() / PAGE_SIZE as u64) as i64;
        if loc.page < 0 || loc.page >= page_count {
            return Err(DatabaseError::PageOutOfRange {
                page: loc.page,
                count: page_count,
            });
        }
        let mut page = Page::new(&self.file, loc.page as u64 * PAGE_SIZE as u64);
        page.remove(loc.slot)
    }

    /// Fsyncs both backing files.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.file.sync_all()?;
        self.fsm.sync_all()?;
        Ok(())
    }

    /// Flushes and seals the table. Every later operation, including a
    /// second close, fails. The OS handles are released on drop.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        // one failing file must not keep the other from being synced
        let mut failures = Vec::new();
        if let Err(err) = self.file.sync_all() {
            failures.push(format!("failed to sync data file: {}", err));
        }
        if let Err(err) = self.fsm.sync_all() {
            failures.push(format!("failed to sync fsm file: {}", err));
        }
        self.closed = true;
        if !failures.is_empty() {
            return Err(DatabaseError::CloseFailed {
                details: failures.join("; "),
            });
        }
        Ok(())
    }

    /// Allocates a page at the end of the table: one FSM byte plus one
    /// zeroed page region, keeping the data file a whole number of pages.
    fn allocate_new_page(&mut self) -> Result<i64> {
        let idx = fsm::append_page(&self.fsm)?;
        io::write_at(
            &self.file,
            &vec![0u8; PAGE_SIZE],
            idx as u64 * PAGE_SIZE as u64,
        )?;
        Ok(idx)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(DatabaseError::TableClosed);
        }
        Ok(())
    }
}
