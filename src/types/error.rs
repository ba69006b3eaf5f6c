use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no room for tuple in page at offset {offset}")]
    PageFull { offset: u64 },

    #[error("no room for new item in node")]
    NodeFull,

    #[error("corrupted page at offset {offset}: {reason}")]
    CorruptedPage { offset: u64, reason: String },

    #[error("corrupted node: {reason}")]
    CorruptedNode { reason: String },

    #[error("invalid slot index {index} (slot count: {max})")]
    InvalidSlotIndex { index: u32, max: u32 },

    #[error("page index {page} out of range (page count: {count})")]
    PageOutOfRange { page: i64, count: i64 },

    #[error("tuple of {size} bytes exceeds page capacity of {max} bytes")]
    TupleTooLarge { size: usize, max: usize },

    #[error("item of {size} bytes exceeds the per-item limit of {max} bytes")]
    ItemTooLarge { size: u32, max: u32 },

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("invalid table name: {name}")]
    InvalidTableName { name: String },

    #[error("{path} is not a directory")]
    NotADirectory { path: String },

    #[error("serialization/deserialization error: {details}")]
    SerializationError { details: String },

    #[error("table is closed")]
    TableClosed,

    #[error("page is already closed")]
    PageClosed,

    #[error("failed to close table: {details}")]
    CloseFailed { details: String },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
