pub mod error;
pub mod key;

use serde::{Deserialize, Serialize};

// Constants following the PostgreSQL-style slotted page layout
pub const PAGE_SIZE: usize = 8192;
pub const PAGE_HEADER_SIZE: usize = 8; // lower (4 bytes) + upper (4 bytes)
pub const TUPLE_POINTER_SIZE: usize = 9; // used (1) + data offset (4) + data size (4)

/// Location of a tuple: page index within the table, slot index within the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleLocation {
    pub page: i64,
    pub slot: u32,
}
