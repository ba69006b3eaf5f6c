use std::fs::File;

use crate::{
    types::{
        error::{DatabaseError, Result},
        PAGE_HEADER_SIZE, PAGE_SIZE, TUPLE_POINTER_SIZE,
    },
    util::{codec, io},
};

/*
 * Page layout on disk (slotted page, grows from both ends):
 * ┌──────────────────────────────────────────────────────────────┐
 * │ PAGE HEADER (8 bytes): lower(4) | upper(4), big-endian       │
 * ├──────────────────────────────────────────────────────────────┤
 * │ TUPLE POINTERS: [used(1)|data_ptr(4)|data_size(4)] ...       │ ← lower
 * ├──────────────────────────────────────────────────────────────┤
 * │ FREE SPACE                                                   │
 * ├──────────────────────────────────────────────────────────────┤
 * │ TUPLE DATA: [...tuple 2...] [...tuple 1...] [...tuple 0...]  │ ← upper
 * └──────────────────────────────────────────────────────────────┘
 *
 * lower points at the first free byte after the pointer section, upper just
 * past the free hole. Tuple bodies grow down from the high end of the page.
 */

pub type Tuple = Vec<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageHeader {
    /// Starting position of the free space (inclusive), page-relative.
    lower: u32,
    /// Ending position of the free space (exclusive), page-relative.
    upper: u32,
}

impl PageHeader {
    fn fresh() -> Self {
        Self {
            lower: PAGE_HEADER_SIZE as u32,
            upper: PAGE_SIZE as u32,
        }
    }

    fn to_bytes(self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(PAGE_HEADER_SIZE);
        codec::put_u32(&mut buffer, self.lower);
        codec::put_u32(&mut buffer, self.upper);
        buffer
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != PAGE_HEADER_SIZE {
            return Err(DatabaseError::SerializationError {
                details: format!(
                    "wrong number of bytes for page header: expected {}, got {}",
                    PAGE_HEADER_SIZE,
                    data.len()
                ),
            });
        }
        Ok(Self {
            lower: codec::get_u32(data, 0)?,
            upper: codec::get_u32(data, 4)?,
        })
    }
}

/// Fixed 9-byte record pointing at one tuple's bytes within its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TuplePointer {
    used: bool,
    data_ptr: u32,
    data_size: u32,
}

impl TuplePointer {
    fn to_bytes(self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(TUPLE_POINTER_SIZE);
        buffer.push(u8::from(self.used));
        codec::put_u32(&mut buffer, self.data_ptr);
        codec::put_u32(&mut buffer, self.data_size);
        buffer
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != TUPLE_POINTER_SIZE {
            return Err(DatabaseError::SerializationError {
                details: format!(
                    "wrong number of bytes for tuple pointer: expected {}, got {}",
                    TUPLE_POINTER_SIZE,
                    data.len()
                ),
            });
        }
        let used = match data[0] {
            0 => false,
            1 => true,
            other => {
                return Err(DatabaseError::SerializationError {
                    details: format!("invalid tuple pointer used flag: {}", other),
                });
            }
        };
        Ok(Self {
            used,
            data_ptr: codec::get_u32(data, 1)?,
            data_size: codec::get_u32(data, 5)?,
        })
    }
}

/// A fixed-length area of a file storing tuples behind a slot directory.
/// The header is read lazily on first use.
pub struct Page<'a> {
    file: &'a File,
    /// Where the page starts in the data file.
    offset: u64,
    header: PageHeader,
    initialized: bool,
}

impl<'a> Page<'a> {
    pub fn new(file: &'a File, offset: u64) -> Self {
        Self {
            file,
            offset,
            header: PageHeader::fresh(),
            initialized: false,
        }
    }

    pub fn init(&mut self) -> Result<()> {
        self.read_header()?;
        self.initialized = true;
        Ok(())
    }

    /// Adds a tuple, reusing a previously freed slot when one exists.
    /// Returns the assigned slot index and the remaining free bytes,
    /// excluding room for one prospective future pointer.
    pub fn add(&mut self, tuple: &[u8]) -> Result<(u32, u32)> {
        if !self.initialized {
            self.init()?;
        }

        let tuple_size = tuple.len() as u32;
        let pointer_count = self.count_tuple_pointers()?;

        // go through existing pointers to see if a deleted one can be reused
        let section_size = self.header.lower - PAGE_HEADER_SIZE as u32;
        let mut buffer = vec![0u8; section_size as usize];
        self.read_at(&mut buffer, PAGE_HEADER_SIZE as u32)?;
        let mut idx = pointer_count;
        let mut reusable_offset: Option<u32> = None;
        for i in 0..pointer_count {
            let start = i as usize * TUPLE_POINTER_SIZE;
            let pointer = TuplePointer::from_bytes(&buffer[start..start + TUPLE_POINTER_SIZE])?;
            if !pointer.used {
                idx = i;
                reusable_offset = Some(PAGE_HEADER_SIZE as u32 + TUPLE_POINTER_SIZE as u32 * i);
                break;
            }
        }

        // a brand-new slot costs pointer space on top of the tuple itself
        let mut required = tuple_size;
        if reusable_offset.is_none() {
            required += TUPLE_POINTER_SIZE as u32;
        }
        if self.header.lower + required > self.header.upper {
            return Err(DatabaseError::PageFull {
                offset: self.offset,
            });
        }

        let tuple_start = self.header.upper - tuple_size;
        self.write_at(tuple, tuple_start)?;
        self.header.upper -= tuple_size;

        let pointer = TuplePointer {
            used: true,
            data_ptr: tuple_start,
            data_size: tuple_size,
        };
        let pointer_offset = match reusable_offset {
            Some(offset) => offset,
            None => {
                let offset = self.header.lower;
                self.header.lower += TUPLE_POINTER_SIZE as u32;
                offset
            }
        };
        self.write_at(&pointer.to_bytes(), pointer_offset)?;

        // persist the updated lower and upper bounds
        self.write_at(&self.header.to_bytes(), 0)?;

        let free = (self.header.upper - self.header.lower)
            .saturating_sub(TUPLE_POINTER_SIZE as u32);
        Ok((idx, free))
    }

    /// Marks the slot at idx as unused. The tuple bytes stay on disk as a
    /// tombstone; vacuuming is out of scope.
    pub fn remove(&mut self, idx: u32) -> Result<()> {
        if !self.initialized {
            self.init()?;
        }
        let pointer_count = self.count_tuple_pointers()?;
        if idx >= pointer_count {
            return Err(DatabaseError::InvalidSlotIndex {
                index: idx,
                max: pointer_count,
            });
        }
        let pointer_start = PAGE_HEADER_SIZE as u32 + TUPLE_POINTER_SIZE as u32 * idx;
        let mut buffer = [0u8; TUPLE_POINTER_SIZE];
        self.read_at(&mut buffer, pointer_start)?;
        let mut pointer = TuplePointer::from_bytes(&buffer)?;
        pointer.used = false;
        self.write_at(&pointer.to_bytes(), pointer_start)?;
        Ok(())
    }

    /// Reads all live tuples in slot order.
    pub fn read_all(&mut self) -> Result<Vec<Tuple>> {
        let entries = self.entries()?;
        Ok(entries.into_iter().map(|(_, tuple)| tuple).collect())
    }

    /// Reads all live tuples together with their slot indexes, so callers
    /// can address individual tuples later even when unused slots exist.
    pub fn entries(&mut self) -> Result<Vec<(u32, Tuple)>> {
        if !self.initialized {
            self.init()?;
        }
        self.read_header()?;

        let pointer_count = self.count_tuple_pointers()?;
        let mut buffer = vec![0u8; pointer_count as usize * TUPLE_POINTER_SIZE];
        self.read_at(&mut buffer, PAGE_HEADER_SIZE as u32)?;

        let mut pointers = Vec::with_capacity(pointer_count as usize);
        for i in 0..pointer_count as usize {
            let start = i * TUPLE_POINTER_SIZE;
            pointers.push(TuplePointer::from_bytes(
                &buffer[start..start + TUPLE_POINTER_SIZE],
            )?);
        }

        let mut tuples = Vec::new();
        for (i, pointer) in pointers.iter().enumerate() {
            if !pointer.used {
                continue;
            }
            let mut data = vec![0u8; pointer.data_size as usize];
            self.read_at(&mut data, pointer.data_ptr)?;
            tuples.push((i as u32, data));
        }
        Ok(tuples)
    }

    pub fn flush(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Flushes and marks the page uninitialized. A later operation re-reads
    /// the header from disk; closing twice in a row is an error.
    pub fn close(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(DatabaseError::PageClosed);
        }
        self.flush()?;
        // a failed flush leaves the page open
        self.initialized = false;
        Ok(())
    }

    fn count_tuple_pointers(&self) -> Result<u32> {
        let section_size = self.header.lower - PAGE_HEADER_SIZE as u32;
        if section_size % TUPLE_POINTER_SIZE as u32 != 0 {
            return Err(DatabaseError::CorruptedPage {
                offset: self.offset,
                reason: format!("invalid pointer section size: {}", section_size),
            });
        }
        Ok(section_size / TUPLE_POINTER_SIZE as u32)
    }

    fn read_header(&mut self) -> Result<()> {
        let mut buffer = [0u8; PAGE_HEADER_SIZE];
        match self.read_at(&mut buffer, 0) {
            Ok(()) => {}
            // nothing to read yet, the region starts past the end of the file
            Err(err) if io::is_unexpected_eof(&err) => {
                self.header = PageHeader::fresh();
                return Ok(());
            }
            Err(err) => return Err(err),
        }
        let header = PageHeader::from_bytes(&buffer)?;
        if header.lower == 0 && header.upper == 0 {
            // zero-filled region freshly allocated by the table layer
            self.header = PageHeader::fresh();
            return Ok(());
        }
        if header.lower < PAGE_HEADER_SIZE as u32
            || header.upper > PAGE_SIZE as u32
            || header.lower > header.upper
        {
            return Err(DatabaseError::CorruptedPage {
                offset: self.offset,
                reason: format!("invalid bounds: lower={}, upper={}", header.lower, header.upper),
            });
        }
        self.header = header;
        Ok(())
    }

    fn write_at(&self, data: &[u8], position: u32) -> Result<()> {
        io::write_at(self.file, data, self.offset + position as u64)
    }

    fn read_at(&self, buffer: &mut [u8], position: u32) -> Result<()> {
        io::read_at(self.file, buffer, self.offset + position as u64)
    }
}
