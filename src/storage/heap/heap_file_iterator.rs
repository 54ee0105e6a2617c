use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::storage::disk::DiskManager;
use crate::tuple::Tuple;

use super::DbFileIterator;

/// Position of an open scan.
struct Cursor {
    /// Next page to load
    next_page: u32,
    /// Tuples of the last loaded page not yet returned
    pending: VecDeque<Tuple>,
}

/// Page-at-a-time scan over a heap file.
///
/// Each page is fetched read-only through the buffer pool, so the scan
/// takes a shared lock on every page it visits. Pages with no tuples are
/// skipped. The page count is re-read whenever the scan moves past the last
/// known page, so pages appended by the same transaction are visited too.
pub struct HeapFileIterator {
    pool: Arc<BufferPool>,
    disk: Arc<DiskManager>,
    table_id: TableId,
    tid: TransactionId,
    cursor: Option<Cursor>,
}

impl HeapFileIterator {
    pub fn new(
        pool: Arc<BufferPool>,
        disk: Arc<DiskManager>,
        table_id: TableId,
        tid: TransactionId,
    ) -> Self {
        Self {
            pool,
            disk,
            table_id,
            tid,
            cursor: None,
        }
    }
}

impl DbFileIterator for HeapFileIterator {
    fn open(&mut self) -> Result<()> {
        self.cursor = Some(Cursor {
            next_page: 0,
            pending: VecDeque::new(),
        });
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(false);
        };

        while cursor.pending.is_empty() {
            if cursor.next_page >= self.disk.num_pages()? {
                return Ok(false);
            }
            let page_id = PageId::new(self.table_id, cursor.next_page);
            let page = self
                .pool
                .get_page(self.tid, page_id, Permissions::ReadOnly)?;
            let tuples = page.read().tuples()?;
            cursor.pending.extend(tuples);
            cursor.next_page += 1;
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement);
        }
        self.cursor
            .as_mut()
            .and_then(|cursor| cursor.pending.pop_front())
            .ok_or(DbError::NoSuchElement)
    }

    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.cursor = None;
    }
}
