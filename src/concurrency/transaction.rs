use std::fmt;

use crate::buffer::BufferPool;
use crate::common::{DbError, Result, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// A unit of work against one buffer pool.
///
/// Completes exactly once. A commit that fails leaves the transaction
/// aborted, because the pool has already rolled its pages back.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: TransactionId::new(),
            state: TransactionState::Active,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    pub fn commit(&mut self, pool: &BufferPool) -> Result<()> {
        self.ensure_active()?;
        match pool.transaction_complete(self.id, true) {
            Ok(()) => {
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(e) => {
                self.state = TransactionState::Aborted;
                Err(e)
            }
        }
    }

    pub fn abort(&mut self, pool: &BufferPool) -> Result<()> {
        self.ensure_active()?;
        self.state = TransactionState::Aborted;
        pool.transaction_complete(self.id, false)
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.is_active() {
            return Err(DbError::InvalidTransactionState {
                tid: self.id,
                state: self.state.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}
