use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Schema, Tuple};

/// A restartable stream of tuples.
///
/// Operators start closed. `has_next` on a closed operator is false and
/// `next` fails with `DbError::NoSuchElement`, as it does once the stream
/// is exhausted.
pub trait OpIterator: Send {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    fn next(&mut self) -> Result<Tuple>;

    /// Restarts the stream from its first tuple.
    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);

    /// Schema of the tuples this operator produces.
    fn schema(&self) -> &Arc<Schema>;
}

/// Operator over a fixed list of tuples.
pub struct TupleIterator {
    schema: Arc<Schema>,
    tuples: Vec<Tuple>,
    position: Option<usize>,
}

impl TupleIterator {
    pub fn new(schema: Arc<Schema>, tuples: Vec<Tuple>) -> Self {
        Self {
            schema,
            tuples,
            position: None,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<()> {
        self.position = Some(0);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self
            .position
            .map_or(false, |position| position < self.tuples.len()))
    }

    fn next(&mut self) -> Result<Tuple> {
        let position = self.position.ok_or(DbError::NoSuchElement)?;
        let tuple = self
            .tuples
            .get(position)
            .cloned()
            .ok_or(DbError::NoSuchElement)?;
        self.position = Some(position + 1);
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.open()
    }

    fn close(&mut self) {
        self.position = None;
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

/// Drains an open operator into a vector.
pub fn collect_tuples(op: &mut dyn OpIterator) -> Result<Vec<Tuple>> {
    let mut tuples = Vec::new();
    while op.has_next()? {
        tuples.push(op.next()?);
    }
    Ok(tuples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{DataType, TupleBuilder};

    fn rows(n: i32) -> (Arc<Schema>, Vec<Tuple>) {
        let schema = Schema::builder()
            .column("x", DataType::Integer)
            .build_arc();
        let tuples = (0..n)
            .map(|i| TupleBuilder::new(schema.clone()).value(i).build().unwrap())
            .collect();
        (schema, tuples)
    }

    #[test]
    fn test_closed_iterator_is_empty() {
        let (schema, tuples) = rows(2);
        let mut it = TupleIterator::new(schema, tuples);
        assert!(!it.has_next().unwrap());
        assert!(matches!(it.next(), Err(DbError::NoSuchElement)));
    }

    #[test]
    fn test_rewind() {
        let (schema, tuples) = rows(3);
        let mut it = TupleIterator::new(schema, tuples.clone());
        it.open().unwrap();
        assert_eq!(collect_tuples(&mut it).unwrap(), tuples);
        assert!(matches!(it.next(), Err(DbError::NoSuchElement)));

        it.rewind().unwrap();
        assert_eq!(collect_tuples(&mut it).unwrap(), tuples);
    }
}
