use std::sync::Arc;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{PageId, Result, TableId, TransactionId};
use crate::storage::page::HeapPage;
use crate::tuple::{Schema, Tuple};

/// A table stored on disk as a sequence of pages.
///
/// Page reads and writes here go straight to disk. Tuple-level operations
/// reach pages through the buffer pool so that they are locked first.
pub trait DbFile: Send + Sync {
    /// Identifier embedded in every `PageId` of this file.
    fn id(&self) -> TableId;

    fn schema(&self) -> &Arc<Schema>;

    /// Reads one page from disk.
    fn read_page(&self, page_id: PageId) -> Result<HeapPage>;

    /// Writes one page to disk at its offset.
    fn write_page(&self, page: &HeapPage) -> Result<()>;

    fn num_pages(&self) -> Result<u32>;

    /// Stores `tuple` and returns the pages it modified.
    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>>;

    /// Removes `tuple` from the page its record id points at and returns
    /// that page.
    fn delete_tuple(&self, pool: &BufferPool, tid: TransactionId, tuple: &Tuple)
        -> Result<PageRef>;

    /// A restartable scan over every tuple, in page then slot order.
    fn iterator(&self, pool: Arc<BufferPool>, tid: TransactionId) -> Box<dyn DbFileIterator>;
}

/// Cursor over the tuples of a `DbFile`.
///
/// Starts closed. `has_next` on a closed cursor is false and `next` fails
/// with `DbError::NoSuchElement`, as it does once the tuples run out.
pub trait DbFileIterator: Send {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    fn next(&mut self) -> Result<Tuple>;

    /// Restarts from the first page. Same as `close` followed by `open`.
    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);
}
