use std::collections::{HashMap, HashSet};
use std::time::Duration;

use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex};

use crate::common::{DbError, PageId, Result, TransactionId};

/// Page lock modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Lock bookkeeping, guarded by the manager's mutex.
///
/// A page is never exclusive to one transaction while shared by another.
/// Upgrading moves the requester out of `shared` and into `exclusive`.
#[derive(Debug, Default)]
struct LockTable {
    /// Exclusive holder per page
    exclusive: HashMap<PageId, TransactionId>,
    /// Shared holders per page
    shared: HashMap<PageId, HashSet<TransactionId>>,
    /// Reverse index for bulk release
    held: HashMap<TransactionId, HashSet<PageId>>,
    /// Wait-for edges of currently blocked transactions
    wait_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl LockTable {
    /// Transactions that prevent `tid` from taking the lock right now.
    fn blockers(&self, tid: TransactionId, pid: PageId, exclusive: bool) -> HashSet<TransactionId> {
        let mut blockers = HashSet::new();
        if let Some(&holder) = self.exclusive.get(&pid) {
            if holder != tid {
                blockers.insert(holder);
            }
        }
        if exclusive {
            if let Some(holders) = self.shared.get(&pid) {
                blockers.extend(holders.iter().copied().filter(|&h| h != tid));
            }
        }
        blockers
    }

    fn grant(&mut self, tid: TransactionId, pid: PageId, exclusive: bool) {
        if exclusive {
            if let Some(holders) = self.shared.get_mut(&pid) {
                holders.remove(&tid);
                if holders.is_empty() {
                    self.shared.remove(&pid);
                }
            }
            self.exclusive.insert(pid, tid);
        } else if self.exclusive.get(&pid) != Some(&tid) {
            self.shared.entry(pid).or_default().insert(tid);
        }
        self.held.entry(tid).or_default().insert(pid);
    }

    fn remove(&mut self, tid: TransactionId, pid: PageId) {
        if self.exclusive.get(&pid) == Some(&tid) {
            self.exclusive.remove(&pid);
        }
        if let Some(holders) = self.shared.get_mut(&pid) {
            holders.remove(&tid);
            if holders.is_empty() {
                self.shared.remove(&pid);
            }
        }
    }

    fn mode(&self, tid: TransactionId, pid: PageId) -> Option<LockMode> {
        if self.exclusive.get(&pid) == Some(&tid) {
            Some(LockMode::Exclusive)
        } else if self.shared.get(&pid).is_some_and(|h| h.contains(&tid)) {
            Some(LockMode::Shared)
        } else {
            None
        }
    }

    fn successors(&self, tid: TransactionId) -> Vec<TransactionId> {
        self.wait_for
            .get(&tid)
            .map(|edges| edges.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Depth-first search from `start` over the wait-for graph. Reaching a
    /// node that is still on the active path means there is a cycle.
    fn has_cycle_from(&self, start: TransactionId) -> bool {
        let mut visited = HashSet::from([start]);
        let mut on_path = HashSet::from([start]);
        let mut stack = vec![(start, self.successors(start))];

        while let Some((_, pending)) = stack.last_mut() {
            match pending.pop() {
                Some(next) => {
                    if on_path.contains(&next) {
                        return true;
                    }
                    if visited.insert(next) {
                        on_path.insert(next);
                        stack.push((next, self.successors(next)));
                    }
                }
                None => {
                    if let Some((done, _)) = stack.pop() {
                        on_path.remove(&done);
                    }
                }
            }
        }
        false
    }
}

/// Page-level shared/exclusive locks with wait-for-graph deadlock detection.
///
/// A blocked request re-checks its lock whenever a lock is released, and at
/// least once per `retry_interval`. Every blocked attempt runs cycle
/// detection; the requester that closes a cycle is the one that aborts.
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
    retry_interval: Duration,
}

impl LockManager {
    /// Creates an empty lock table. Blocked requests re-check at least once
    /// per `retry_interval`.
    pub fn new(retry_interval: Duration) -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            retry_interval,
        }
    }

    /// Blocks until `tid` holds the lock on `pid`, or fails with
    /// `DbError::Deadlock` if waiting would close a wait-for cycle.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, exclusive: bool) -> Result<()> {
        let mut table = self.table.lock();
        loop {
            let blockers = table.blockers(tid, pid, exclusive);
            if blockers.is_empty() {
                table.grant(tid, pid, exclusive);
                table.wait_for.remove(&tid);
                trace!(
                    "{} granted {} lock on {}",
                    tid,
                    if exclusive { "exclusive" } else { "shared" },
                    pid
                );
                return Ok(());
            }

            let holder = blockers.iter().copied().min().unwrap_or(tid);
            table.wait_for.insert(tid, blockers);
            if table.has_cycle_from(tid) {
                table.wait_for.remove(&tid);
                warn!("deadlock: {} aborts waiting on {} for {}", tid, holder, pid);
                return Err(DbError::Deadlock { tid, holder });
            }

            debug!("{} waiting on {} for {}", tid, holder, pid);
            self.released.wait_for(&mut table, self.retry_interval);
        }
    }

    /// Drops `tid`'s lock on `pid` and wakes every waiter.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut table = self.table.lock();
        table.remove(tid, pid);
        if let Some(pages) = table.held.get_mut(&tid) {
            pages.remove(&pid);
            if pages.is_empty() {
                table.held.remove(&tid);
            }
        }
        drop(table);
        self.released.notify_all();
    }

    /// Turns `tid`'s exclusive lock on `pid` back into a shared one and wakes
    /// every waiter. Does nothing unless `tid` holds the page exclusively.
    ///
    /// Only safe when `tid` has not changed the page since it upgraded.
    pub fn downgrade(&self, tid: TransactionId, pid: PageId) {
        let mut table = self.table.lock();
        if table.exclusive.get(&pid) != Some(&tid) {
            return;
        }
        table.exclusive.remove(&pid);
        table.shared.entry(pid).or_default().insert(tid);
        drop(table);
        trace!("{} downgraded its lock on {}", tid, pid);
        self.released.notify_all();
    }

    /// Drops every lock `tid` holds.
    pub fn release_all(&self, tid: TransactionId) {
        let mut table = self.table.lock();
        let pages = table.held.remove(&tid).unwrap_or_default();
        for pid in &pages {
            table.remove(tid, *pid);
        }
        table.wait_for.remove(&tid);
        drop(table);
        trace!("{} released {} locks", tid, pages.len());
        self.released.notify_all();
    }

    /// True when `tid` holds a lock of either mode on `pid`.
    pub fn holds(&self, tid: TransactionId, pid: PageId) -> bool {
        self.table.lock().mode(tid, pid).is_some()
    }

    /// The mode of `tid`'s lock on `pid`, if any.
    pub fn lock_mode(&self, tid: TransactionId, pid: PageId) -> Option<LockMode> {
        self.table.lock().mode(tid, pid)
    }

    /// Pages `tid` currently holds any lock on, in page order.
    pub fn pages_locked_by(&self, tid: TransactionId) -> Vec<PageId> {
        let table = self.table.lock();
        let mut pages: Vec<PageId> = table
            .held
            .get(&tid)
            .map(|p| p.iter().copied().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }

    /// True while `tid` is blocked inside `acquire`.
    pub fn is_waiting(&self, tid: TransactionId) -> bool {
        self.table.lock().wait_for.contains_key(&tid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;
    use std::sync::{mpsc, Arc};
    use std::thread;

    fn pid(n: u32) -> PageId {
        PageId::new(TableId::new(1), n)
    }

    fn manager() -> LockManager {
        LockManager::new(Duration::from_millis(5))
    }

    #[test]
    fn test_shared_locks_are_compatible() {
        let lm = manager();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        lm.acquire(t1, pid(0), false).unwrap();
        lm.acquire(t2, pid(0), false).unwrap();
        assert_eq!(lm.lock_mode(t1, pid(0)), Some(LockMode::Shared));
        assert_eq!(lm.lock_mode(t2, pid(0)), Some(LockMode::Shared));
    }

    #[test]
    fn test_upgrade_when_sole_shared_holder() {
        let lm = manager();
        let t1 = TransactionId::new();

        lm.acquire(t1, pid(0), false).unwrap();
        lm.acquire(t1, pid(0), true).unwrap();
        assert_eq!(lm.lock_mode(t1, pid(0)), Some(LockMode::Exclusive));

        // Reading a page already held exclusively keeps the exclusive lock.
        lm.acquire(t1, pid(0), false).unwrap();
        assert_eq!(lm.lock_mode(t1, pid(0)), Some(LockMode::Exclusive));
    }

    #[test]
    fn test_downgrade_readmits_readers() {
        let lm = manager();
        let (t1, t2) = (TransactionId::new(), TransactionId::new());

        lm.acquire(t1, pid(0), false).unwrap();
        lm.acquire(t1, pid(0), true).unwrap();
        lm.downgrade(t1, pid(0));
        assert_eq!(lm.lock_mode(t1, pid(0)), Some(LockMode::Shared));

        lm.acquire(t2, pid(0), false).unwrap();
        assert_eq!(lm.lock_mode(t2, pid(0)), Some(LockMode::Shared));

        // A shared holder has nothing to downgrade.
        lm.downgrade(t2, pid(0));
        assert_eq!(lm.lock_mode(t2, pid(0)), Some(LockMode::Shared));
    }

    #[test]
    fn test_release_all() {
        let lm = manager();
        let t1 = TransactionId::new();

        lm.acquire(t1, pid(0), true).unwrap();
        lm.acquire(t1, pid(1), false).unwrap();
        assert_eq!(lm.pages_locked_by(t1), vec![pid(0), pid(1)]);

        lm.release_all(t1);
        assert!(!lm.holds(t1, pid(0)));
        assert!(!lm.holds(t1, pid(1)));
        assert!(lm.pages_locked_by(t1).is_empty());
    }

    #[test]
    fn test_release_single_page() {
        let lm = manager();
        let t1 = TransactionId::new();

        lm.acquire(t1, pid(0), true).unwrap();
        lm.acquire(t1, pid(1), true).unwrap();
        lm.release(t1, pid(0));
        assert!(!lm.holds(t1, pid(0)));
        assert!(lm.holds(t1, pid(1)));
    }

    #[test]
    fn test_exclusive_blocks_until_release() {
        let lm = Arc::new(manager());
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        lm.acquire(t1, pid(0), true).unwrap();

        let (tx, rx) = mpsc::channel();
        let lm2 = Arc::clone(&lm);
        let handle = thread::spawn(move || {
            lm2.acquire(t2, pid(0), false).unwrap();
            tx.send(()).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert!(lm.is_waiting(t2));

        lm.release_all(t1);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
        assert!(lm.holds(t2, pid(0)));
        assert!(!lm.is_waiting(t2));
    }

    #[test]
    fn test_upgrade_blocked_by_other_reader_is_deadlock_when_both_upgrade() {
        let lm = Arc::new(manager());
        let (t1, t2) = (TransactionId::new(), TransactionId::new());
        lm.acquire(t1, pid(0), false).unwrap();
        lm.acquire(t2, pid(0), false).unwrap();

        let lm1 = Arc::clone(&lm);
        let first = thread::spawn(move || lm1.acquire(t1, pid(0), true));

        while !lm.is_waiting(t1) {
            thread::sleep(Duration::from_millis(1));
        }
        let err = lm.acquire(t2, pid(0), true).unwrap_err();
        assert!(matches!(err, DbError::Deadlock { tid, .. } if tid == t2));

        lm.release_all(t2);
        first.join().unwrap().unwrap();
        assert_eq!(lm.lock_mode(t1, pid(0)), Some(LockMode::Exclusive));
    }

    #[test]
    fn test_cycle_detection_is_iterative_over_long_chains() {
        let mut table = LockTable::default();
        let tids: Vec<TransactionId> = (0..10_000).map(|_| TransactionId::new()).collect();
        for pair in tids.windows(2) {
            table.wait_for.insert(pair[0], HashSet::from([pair[1]]));
        }
        assert!(!table.has_cycle_from(tids[0]));

        table
            .wait_for
            .insert(tids[tids.len() - 1], HashSet::from([tids[0]]));
        assert!(table.has_cycle_from(tids[0]));
    }
}
