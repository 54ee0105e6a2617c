use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::catalog::Catalog;
use crate::common::{
    DbError, PageId, Permissions, Result, StorageConfig, TableId, TransactionId,
};
use crate::concurrency::LockManager;
use crate::storage::page::HeapPage;
use crate::tuple::Tuple;

use super::LruCache;

/// Shared handle to a cached page. Mutations through one handle are seen by
/// every other holder of the same page.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// BufferPool caches pages read from heap files and enforces page locking
/// before any page is handed out.
///
/// Eviction is NO-STEAL: a page dirtied by a live transaction stays cached
/// until that transaction commits (the page is written) or aborts (the page
/// is re-read from disk). When every cached page is dirty, eviction fails
/// with `DbError::BufferPoolFull`.
///
/// Lock order: the cache mutex may be taken before a page's `RwLock`, never
/// while holding one.
pub struct BufferPool {
    config: StorageConfig,
    catalog: Arc<Catalog>,
    lock_manager: LockManager,
    cache: Mutex<LruCache<PageRef>>,
}

impl BufferPool {
    /// Creates an empty pool over the tables in `catalog`. Fails when
    /// `config` is invalid.
    pub fn new(config: StorageConfig, catalog: Arc<Catalog>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            lock_manager: LockManager::new(config.lock_retry_interval),
            cache: Mutex::new(LruCache::new()),
            catalog,
            config,
        })
    }

    /// The configuration this pool was built with.
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// The catalog pages are read through.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// The page lock manager shared by every transaction using this pool.
    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    /// Maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.config.buffer_pool_pages
    }

    /// Locks `page_id` for `tid` and returns the cached page, reading it
    /// from its heap file on a miss.
    ///
    /// `ReadOnly` takes a shared lock and `ReadWrite` an exclusive one. The
    /// call blocks while another transaction holds a conflicting lock and
    /// fails with `DbError::Deadlock` if waiting would deadlock.
    pub fn get_page(
        &self,
        tid: TransactionId,
        page_id: PageId,
        perm: Permissions,
    ) -> Result<PageRef> {
        self.lock_manager
            .acquire(tid, page_id, perm.is_exclusive())?;

        let mut cache = self.cache.lock();
        if let Some(page) = cache.get(&page_id) {
            return Ok(Arc::clone(page));
        }

        if cache.len() >= self.capacity() {
            self.evict_page(&mut cache)?;
        }
        let file = self.catalog.file(page_id.table_id)?;
        let page = Arc::new(RwLock::new(file.read_page(page_id)?));
        cache.insert(page_id, Arc::clone(&page));
        debug!("{} read {} into the buffer pool", tid, page_id);
        Ok(page)
    }

    /// Inserts `tuple` into table `table_id` on behalf of `tid`. On success
    /// the tuple carries its new record id and every page the insert touched
    /// is cached and dirty.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<()> {
        let file = self.catalog.file(table_id)?;
        for page in file.insert_tuple(self, tid, tuple)? {
            self.install_dirty(tid, page)?;
        }
        Ok(())
    }

    /// Deletes `tuple` from the page its record id names.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        let file = self.catalog.file(record_id.page_id.table_id)?;
        let page = file.delete_tuple(self, tid, tuple)?;
        self.install_dirty(tid, page)
    }

    fn install_dirty(&self, tid: TransactionId, page: PageRef) -> Result<()> {
        let page_id = {
            let mut guard = page.write();
            guard.mark_dirty(Some(tid));
            guard.page_id()
        };

        let mut cache = self.cache.lock();
        if !cache.contains(&page_id) && cache.len() >= self.capacity() {
            self.evict_page(&mut cache)?;
        }
        cache.insert(page_id, page);
        Ok(())
    }

    /// Releases `tid`'s lock on one page before the transaction ends.
    ///
    /// This breaks two-phase locking: another transaction may change the
    /// page before `tid` finishes. Only use it for pages whose contents did
    /// not influence anything `tid` wrote.
    pub fn unsafe_release_page(&self, tid: TransactionId, page_id: PageId) {
        self.lock_manager.release(tid, page_id);
    }

    /// True when `tid` holds a lock of either mode on `page_id`.
    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds(tid, page_id)
    }

    /// Commits `tid`.
    pub fn commit(&self, tid: TransactionId) -> Result<()> {
        self.transaction_complete(tid, true)
    }

    /// Aborts `tid`.
    pub fn abort(&self, tid: TransactionId) -> Result<()> {
        self.transaction_complete(tid, false)
    }

    /// Ends `tid`. Commit writes every page `tid` dirtied; abort replaces
    /// each of them with a fresh copy from disk. All of `tid`'s locks are
    /// released afterwards, whatever the outcome of that step.
    ///
    /// If a commit fails to write a page, the pages not yet written are
    /// restored from disk as on abort and the write error is returned.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let outcome = if commit {
            match self.flush_pages(tid) {
                Ok(()) => Ok(()),
                Err(e) => {
                    warn!("{} failed to commit: {}", tid, e);
                    if let Err(restore_err) = self.restore_pages(tid) {
                        warn!("{} could not restore pages: {}", tid, restore_err);
                    }
                    Err(e)
                }
            }
        } else {
            self.restore_pages(tid)
        };

        self.lock_manager.release_all(tid);
        info!(
            "{} {}",
            tid,
            if commit { "committed" } else { "aborted" }
        );
        outcome
    }

    /// Writes every page dirtied by `tid` and marks it clean.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        let cache = self.cache.lock();
        for (_, page) in cache.iter() {
            let mut guard = page.write();
            if guard.dirtier() == Some(tid) {
                self.write_back(&mut guard)?;
            }
        }
        Ok(())
    }

    /// Drops every page dirtied by `tid` and caches a fresh copy read from
    /// disk in its place. A page that cannot be re-read stays uncached and
    /// is read again on its next access.
    fn restore_pages(&self, tid: TransactionId) -> Result<()> {
        let mut cache = self.cache.lock();
        let dirtied: Vec<PageId> = cache
            .iter()
            .filter(|(_, page)| page.read().dirtier() == Some(tid))
            .map(|(page_id, _)| *page_id)
            .collect();

        let mut outcome = Ok(());
        for page_id in dirtied {
            cache.remove(&page_id);
            let fresh = self
                .catalog
                .file(page_id.table_id)
                .and_then(|file| file.read_page(page_id));
            match fresh {
                Ok(page) => {
                    cache.insert(page_id, Arc::new(RwLock::new(page)));
                }
                Err(e) => {
                    warn!("could not re-read {} after abort: {}", page_id, e);
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
            }
        }
        outcome
    }

    /// Writes every dirty page, whoever dirtied it.
    pub fn flush_all_pages(&self) -> Result<()> {
        let cache = self.cache.lock();
        for (_, page) in cache.iter() {
            let mut guard = page.write();
            if guard.is_dirty() {
                self.write_back(&mut guard)?;
            }
        }
        Ok(())
    }

    /// Writes one cached page if it is dirty. Returns false when the page is
    /// not cached.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let cache = self.cache.lock();
        match cache.peek(&page_id) {
            Some(page) => {
                let mut guard = page.write();
                if guard.is_dirty() {
                    self.write_back(&mut guard)?;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn write_back(&self, page: &mut HeapPage) -> Result<()> {
        let file = self.catalog.file(page.page_id().table_id)?;
        file.write_page(page)?;
        page.mark_dirty(None);
        Ok(())
    }

    /// Removes a page from the cache without writing it.
    pub fn discard_page(&self, page_id: PageId) {
        self.cache.lock().remove(&page_id);
    }

    /// Evicts the least recently used clean page. A clean page matches its
    /// disk image, so nothing is written.
    fn evict_page(&self, cache: &mut LruCache<PageRef>) -> Result<()> {
        let victim = cache
            .iter()
            .find(|(_, page)| !page.read().is_dirty())
            .map(|(page_id, _)| *page_id);

        let Some(page_id) = victim else {
            warn!("buffer pool full: all {} cached pages are dirty", cache.len());
            return Err(DbError::BufferPoolFull);
        };

        cache.remove(&page_id);
        debug!("evicted {}", page_id);
        Ok(())
    }

    /// Number of pages currently cached.
    pub fn cached_page_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// True when `page_id` is in the cache.
    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.cache.lock().contains(&page_id)
    }

    /// Cached page ids from least to most recently used.
    pub fn cached_page_ids(&self) -> Vec<PageId> {
        self.cache.lock().page_ids()
    }
}
