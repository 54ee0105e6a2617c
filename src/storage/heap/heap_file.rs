use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{
    DbError, PageId, Permissions, Result, StorageConfig, TableId, TransactionId,
};
use crate::concurrency::LockMode;
use crate::storage::disk::DiskManager;
use crate::storage::page::HeapPage;
use crate::tuple::{Schema, Tuple};

use super::{DbFile, DbFileIterator, HeapFileIterator};

/// An unordered collection of tuples stored as a sequence of heap pages.
///
/// Page `n` occupies bytes `[n * page_size, (n + 1) * page_size)` of the
/// backing file.
pub struct HeapFile {
    table_id: TableId,
    schema: Arc<Schema>,
    disk: Arc<DiskManager>,
}

impl HeapFile {
    /// Opens (or creates) the heap file at `path`. The table id is derived
    /// from the file's absolute path, so reopening the same file yields the
    /// same id.
    pub fn open<P: AsRef<Path>>(
        path: P,
        schema: Arc<Schema>,
        config: &StorageConfig,
    ) -> Result<Self> {
        let disk = DiskManager::new(path.as_ref(), config.page_size)?;
        let absolute = std::fs::canonicalize(path.as_ref())?;
        let mut hasher = DefaultHasher::new();
        absolute.hash(&mut hasher);
        let table_id = TableId::new(hasher.finish() as u32);
        Self::from_disk(disk, table_id, schema, config)
    }

    /// Opens (or creates) the heap file at `path` under an explicit id.
    pub fn with_table_id<P: AsRef<Path>>(
        path: P,
        table_id: TableId,
        schema: Arc<Schema>,
        config: &StorageConfig,
    ) -> Result<Self> {
        let disk = DiskManager::new(path.as_ref(), config.page_size)?;
        Self::from_disk(disk, table_id, schema, config)
    }

    fn from_disk(
        disk: DiskManager,
        table_id: TableId,
        schema: Arc<Schema>,
        config: &StorageConfig,
    ) -> Result<Self> {
        config.validate()?;
        let slots = HeapPage::slots_per_page(config.page_size, schema.tuple_size());
        if slots == 0 {
            return Err(DbError::InvalidConfig(format!(
                "{} byte pages cannot hold a {} byte tuple",
                config.page_size,
                schema.tuple_size()
            )));
        }
        if slots > HeapPage::MAX_SLOTS {
            return Err(DbError::InvalidConfig(format!(
                "{} byte pages hold {} tuples of {} bytes, more than {} slots",
                config.page_size,
                slots,
                schema.tuple_size(),
                HeapPage::MAX_SLOTS
            )));
        }
        Ok(Self {
            table_id,
            schema,
            disk: Arc::new(disk),
        })
    }

    pub fn path(&self) -> &Path {
        self.disk.get_db_path()
    }

    pub fn page_size(&self) -> usize {
        self.disk.page_size()
    }

    fn check_table(&self, page_id: PageId) -> Result<()> {
        if page_id.table_id != self.table_id {
            return Err(DbError::TableMismatch {
                expected: self.table_id,
                found: page_id.table_id,
            });
        }
        Ok(())
    }

    /// Locks one page exclusively and stores `tuple` there if it has a free
    /// slot. A full page is returned to the lock mode held before the call:
    /// unlocked, or shared if the exclusive lock was an upgrade.
    fn try_insert(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        page_no: u32,
        tuple: &mut Tuple,
    ) -> Result<Option<PageRef>> {
        let page_id = PageId::new(self.table_id, page_no);
        let mode_before = pool.lock_manager().lock_mode(tid, page_id);
        let page = pool.get_page(tid, page_id, Permissions::ReadWrite)?;
        {
            let mut guard = page.write();
            if guard.has_free_slot() {
                guard.insert_tuple(tuple)?;
                drop(guard);
                return Ok(Some(page));
            }
        }

        match mode_before {
            None => pool.unsafe_release_page(tid, page_id),
            Some(LockMode::Shared) => pool.lock_manager().downgrade(tid, page_id),
            Some(LockMode::Exclusive) => {}
        }
        Ok(None)
    }
}

impl DbFile for HeapFile {
    fn id(&self) -> TableId {
        self.table_id
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn read_page(&self, page_id: PageId) -> Result<HeapPage> {
        self.check_table(page_id)?;

        let mut data = vec![0u8; self.page_size()];
        match self.disk.read_page(page_id.page_no, &mut data) {
            Ok(()) => {}
            Err(DbError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(DbError::CorruptPage {
                    page_id,
                    reason: "short read".to_string(),
                });
            }
            Err(e) => return Err(e),
        }
        HeapPage::new(page_id, data, self.schema.clone())
    }

    fn write_page(&self, page: &HeapPage) -> Result<()> {
        let page_id = page.page_id();
        self.check_table(page_id)?;
        self.disk.write_page(page_id.page_no, page.page_data())
    }

    fn num_pages(&self) -> Result<u32> {
        self.disk.num_pages()
    }

    /// First fit: the lowest-numbered page with a free slot receives the
    /// tuple. A full page scanned on the way goes back to the lock mode the
    /// transaction held before the insert. When every page is full, an empty
    /// page is appended to the file and the tuple goes into its cached copy,
    /// so the new tuple reaches disk only when the transaction commits.
    ///
    /// An appended page is visible to other inserts before its creator locks
    /// it. If another transaction fills it first, the scan resumes over the
    /// pages appended since and appends again if needed.
    fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>> {
        if !tuple.schema().same_layout(&self.schema) {
            return Err(DbError::SchemaMismatch(format!(
                "tuple does not fit the schema of {}",
                self.table_id
            )));
        }

        let mut scanned = 0;
        loop {
            let num_pages = self.num_pages()?;
            for page_no in scanned..num_pages {
                if let Some(page) = self.try_insert(pool, tid, page_no, tuple)? {
                    return Ok(vec![page]);
                }
            }
            scanned = num_pages;

            let page_no = self
                .disk
                .allocate_page(&HeapPage::empty_page_data(self.page_size()))?;
            debug!("{} appended {} for insert", tid, PageId::new(self.table_id, page_no));
            if let Some(page) = self.try_insert(pool, tid, page_no, tuple)? {
                return Ok(vec![page]);
            }
            debug!("{} lost page {} to another insert", tid, page_no);
        }
    }

    fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<PageRef> {
        let record_id = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        self.check_table(record_id.page_id)?;

        let page = pool.get_page(tid, record_id.page_id, Permissions::ReadWrite)?;
        page.write().delete_tuple(tuple)?;
        Ok(page)
    }

    fn iterator(&self, pool: Arc<BufferPool>, tid: TransactionId) -> Box<dyn DbFileIterator> {
        Box::new(HeapFileIterator::new(
            pool,
            Arc::clone(&self.disk),
            self.table_id,
            tid,
        ))
    }
}
