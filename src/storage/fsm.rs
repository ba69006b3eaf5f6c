//! Free-space map: one byte per page, tracking quantized fullness so the
//! table layer can skip obviously-full pages. A simplified take on the
//! PostgreSQL free space map.

use std::fs::File;
use std::os::unix::fs::FileExt;

use crate::{
    types::{error::Result, PAGE_SIZE},
    util::io,
};

/// How many bytes one unit in a capacity byte stands for.
pub const FSM_DENSITY: u32 = (PAGE_SIZE / 256) as u32;

const SCAN_CHUNK_SIZE: usize = 1024;

/// Decodes a capacity byte into the number of free bytes it guarantees.
pub fn capacity_to_free_space(capacity: u8) -> u32 {
    PAGE_SIZE as u32 - (capacity as u32 + 1) * FSM_DENSITY
}

/// Quantizes a free byte count into a capacity byte. Lossy and rounds
/// towards "full": less than one density unit left counts as no room.
pub fn free_space_to_capacity(free_space: u32) -> u8 {
    let used = PAGE_SIZE as u32 - free_space;
    (used / FSM_DENSITY).min(255) as u8
}

/// Finds the index of the first page with at least min_size free bytes,
/// or -1 when no existing page has enough room.
pub fn find_free_page(fsm: &File, min_size: u32) -> Result<i64> {
    let mut buffer = [0u8; SCAN_CHUNK_SIZE];
    let mut chunk = 0usize;
    loop {
        let read = fsm.read_at(&mut buffer, (chunk * SCAN_CHUNK_SIZE) as u64)?;
        if read == 0 {
            return Ok(-1);
        }
        // only the bytes actually read are valid; the tail of the buffer may
        // still hold data from the previous chunk
        for (j, &capacity) in buffer[..read].iter().enumerate() {
            if capacity_to_free_space(capacity) >= min_size {
                return Ok((chunk * SCAN_CHUNK_SIZE + j) as i64);
            }
        }
        if read < SCAN_CHUNK_SIZE {
            return Ok(-1);
        }
        chunk += 1;
    }
}

/// Appends a capacity byte for a brand-new empty page and returns the index
/// of that page.
pub fn append_page(fsm: &File) -> Result<i64> {
    let offset = fsm.metadata()?.len();
    io::write_at(fsm, &[0u8], offset)?;
    Ok(offset as i64)
}

/// Records the remaining free space for a page.
pub fn update(fsm: &File, idx: i64, free_space: u32) -> Result<()> {
    io::write_at(fsm, &[free_space_to_capacity(free_space)], idx as u64)
}
