use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Schema, Tuple};

use super::{JoinPredicate, OpIterator};

/// Nested-loop join.
///
/// For each left tuple the right child is scanned in full and rewound.
/// Output tuples are the left values followed by the right values.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,
    schema: Arc<Schema>,
    outer: Option<Tuple>,
    lookahead: Option<Tuple>,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn OpIterator>,
        right: Box<dyn OpIterator>,
    ) -> Self {
        let schema = Arc::new(Schema::merge(left.schema(), right.schema()));
        Self {
            predicate,
            left,
            right,
            schema,
            outer: None,
            lookahead: None,
        }
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }

    pub fn left_field_name(&self) -> Option<&str> {
        self.left
            .schema()
            .column(self.predicate.field1())
            .map(|c| c.name())
    }

    pub fn right_field_name(&self) -> Option<&str> {
        self.right
            .schema()
            .column(self.predicate.field2())
            .map(|c| c.name())
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>> {
        loop {
            if self.outer.is_none() {
                if !self.left.has_next()? {
                    return Ok(None);
                }
                self.outer = Some(self.left.next()?);
            }
            let Some(outer) = self.outer.as_ref() else {
                return Ok(None);
            };

            while self.right.has_next()? {
                let inner = self.right.next()?;
                if self.predicate.filter(outer, &inner) {
                    return Tuple::merge(outer, &inner, Arc::clone(&self.schema)).map(Some);
                }
            }
            self.right.rewind()?;
            self.outer = None;
        }
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> Result<()> {
        self.outer = None;
        self.lookahead = None;
        self.left.open()?;
        self.right.open()
    }

    fn has_next(&mut self) -> Result<bool> {
        if self.lookahead.is_none() {
            self.lookahead = self.fetch_next()?;
        }
        Ok(self.lookahead.is_some())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(DbError::NoSuchElement);
        }
        self.lookahead.take().ok_or(DbError::NoSuchElement)
    }

    fn rewind(&mut self) -> Result<()> {
        self.outer = None;
        self.lookahead = None;
        self.left.rewind()?;
        self.right.rewind()
    }

    fn close(&mut self) {
        self.outer = None;
        self.lookahead = None;
        self.left.close();
        self.right.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
