use thiserror::Error;

use super::types::{PageId, RecordId, TableId, TransactionId};

/// Storage engine error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Deadlock detected: {tid} would wait on {holder}")]
    Deadlock {
        tid: TransactionId,
        holder: TransactionId,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt page {page_id}: {reason}")]
    CorruptPage { page_id: PageId, reason: String },

    #[error("Buffer pool is full, every cached page is dirty")]
    BufferPoolFull,

    #[error("Tuple has no record id")]
    MissingRecordId,

    #[error("Tuple belongs to {found}, not {expected}")]
    TableMismatch { expected: TableId, found: TableId },

    #[error("{record_id} is not stored on {page_id}")]
    RecordNotOnPage {
        record_id: RecordId,
        page_id: PageId,
    },

    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(usize),

    #[error("Slot {0} is empty")]
    EmptySlot(usize),

    #[error("Page is full")]
    PageFull,

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Table {0} not found")]
    TableNameNotFound(String),

    #[error("No more tuples")]
    NoSuchElement,

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Value of {len} bytes does not fit in CHAR({max})")]
    ValueTooLong { len: usize, max: usize },

    #[error("Aggregate {0} is not supported on this column type")]
    UnsupportedAggregate(String),

    #[error("Integer overflow: {0}")]
    Overflow(String),

    #[error("Transaction {tid} is already {state}")]
    InvalidTransactionState { tid: TransactionId, state: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DbError {
    /// True for errors that require the caller to abort the transaction.
    pub fn is_abort(&self) -> bool {
        matches!(self, DbError::Deadlock { .. })
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
