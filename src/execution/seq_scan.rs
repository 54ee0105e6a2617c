use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{DbError, Result, TableId, TransactionId};
use crate::storage::heap::DbFileIterator;
use crate::tuple::{Schema, Tuple};

use super::OpIterator;

/// Scans every tuple of one table in storage order.
///
/// Output columns are named `alias.column`. Tuples keep their record ids,
/// so a scan can feed a delete.
pub struct SeqScan {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: TableId,
    alias: String,
    schema: Arc<Schema>,
    inner: Option<Box<dyn DbFileIterator>>,
}

impl SeqScan {
    pub fn new(
        pool: Arc<BufferPool>,
        tid: TransactionId,
        table_id: TableId,
        alias: impl Into<String>,
    ) -> Result<Self> {
        let alias = alias.into();
        let schema = Arc::new(pool.catalog().schema(table_id)?.with_prefix(&alias));
        Ok(Self {
            pool,
            tid,
            table_id,
            alias,
            schema,
            inner: None,
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn table_name(&self) -> Result<String> {
        self.pool.catalog().table_name(self.table_id)
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Points the scan at another table. The scan is closed.
    pub fn reset(&mut self, table_id: TableId, alias: impl Into<String>) -> Result<()> {
        let alias = alias.into();
        let schema = self.pool.catalog().schema(table_id)?.with_prefix(&alias);
        self.close();
        self.table_id = table_id;
        self.alias = alias;
        self.schema = Arc::new(schema);
        Ok(())
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<()> {
        let file = self.pool.catalog().file(self.table_id)?;
        let mut inner = file.iterator(Arc::clone(&self.pool), self.tid);
        inner.open()?;
        self.inner = Some(inner);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        match self.inner.as_mut() {
            Some(inner) => inner.has_next(),
            None => Ok(false),
        }
    }

    fn next(&mut self) -> Result<Tuple> {
        let inner = self.inner.as_mut().ok_or(DbError::NoSuchElement)?;
        inner.next()?.with_schema(Arc::clone(&self.schema))
    }

    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.close();
        }
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
