//! Heapstore - a transactional heap-file storage engine in Rust
//!
//! Tables are unordered heap files of fixed-size pages. Every page access
//! goes through a buffer pool that locks the page for the requesting
//! transaction first, so concurrent transactions are serializable under
//! strict two-phase locking.
//!
//! # Architecture
//!
//! - **Storage Layer** (`storage`): Files and page layout
//!   - `DiskManager`: Reads and writes fixed-size pages of one file
//!   - `HeapPage`: Slot bitmap plus fixed-width tuple slots
//!   - `HeapFile`: First-fit tuple placement and a restartable page scan
//!
//! - **Buffer Pool** (`buffer`): Page cache and transaction completion
//!   - `BufferPool`: NO-STEAL LRU cache; commit writes, abort re-reads
//!   - `LruCache`: Recency-ordered page map
//!
//! - **Concurrency** (`concurrency`): Page locks and transactions
//!   - `LockManager`: Shared/exclusive locks with wait-for-graph deadlock detection
//!   - `Transaction`: Single-completion commit/abort handle
//!
//! - **Catalog** (`catalog`): Table id and name to heap file
//!
//! - **Execution** (`execution`): Pull-based operators
//!   - `SeqScan`, `Filter`, `Join`, `Aggregate`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heapstore::buffer::BufferPool;
//! use heapstore::catalog::Catalog;
//! use heapstore::concurrency::Transaction;
//! use heapstore::storage::heap::{DbFile, HeapFile};
//! use heapstore::tuple::{DataType, Schema, TupleBuilder};
//! use heapstore::StorageConfig;
//!
//! let config = StorageConfig::default();
//! let schema = Schema::builder()
//!     .column("id", DataType::Integer)
//!     .column("name", DataType::Char(16))
//!     .build_arc();
//!
//! let file = Arc::new(HeapFile::open("users.dat", schema.clone(), &config).unwrap());
//! let catalog = Arc::new(Catalog::new());
//! catalog.add_table(file.clone(), "users");
//! let pool = BufferPool::new(config, catalog).unwrap();
//!
//! let mut txn = Transaction::new();
//! let mut tuple = TupleBuilder::new(schema)
//!     .value(1i32)
//!     .value("alice")
//!     .build()
//!     .unwrap();
//! pool.insert_tuple(txn.id(), file.id(), &mut tuple).unwrap();
//! txn.commit(&pool).unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod execution;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{
    DbError, PageId, Permissions, RecordId, Result, SlotId, StorageConfig, TableId,
    TransactionId,
};
