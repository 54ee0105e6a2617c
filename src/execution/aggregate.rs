use std::fmt;
use std::sync::Arc;

use linked_hash_map::LinkedHashMap;

use crate::common::{DbError, Result};
use crate::tuple::{Column, DataType, Schema, Tuple, Value};

use super::OpIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        f.write_str(name)
    }
}

/// Running state of one integer group.
#[derive(Debug, Clone, Copy, Default)]
struct IntegerGroup {
    value: i64,
    count: i64,
}

/// Per-group running values, keyed by group value (`None` when ungrouped).
/// Groups keep first-seen order.
enum Accumulator {
    /// Integer columns support every op
    Integer(LinkedHashMap<Option<Value>, IntegerGroup>),
    /// Other columns can only be counted
    Text(LinkedHashMap<Option<Value>, i64>),
}

impl Accumulator {
    fn new(data_type: &DataType, op: AggregateOp) -> Result<Self> {
        if data_type.is_numeric() {
            Ok(Accumulator::Integer(LinkedHashMap::new()))
        } else if op == AggregateOp::Count {
            Ok(Accumulator::Text(LinkedHashMap::new()))
        } else {
            Err(DbError::UnsupportedAggregate(format!(
                "{} over a {} column",
                op, data_type
            )))
        }
    }

    fn merge(&mut self, op: AggregateOp, group: Option<Value>, value: &Value) -> Result<()> {
        match self {
            Accumulator::Integer(groups) => {
                let v = value.as_i64().ok_or_else(|| {
                    DbError::SchemaMismatch(format!("{} is not an integer", value))
                })?;
                let state = groups.entry(group).or_insert_with(IntegerGroup::default);
                state.value = match op {
                    AggregateOp::Min if state.count > 0 => state.value.min(v),
                    AggregateOp::Max if state.count > 0 => state.value.max(v),
                    AggregateOp::Min | AggregateOp::Max => v,
                    AggregateOp::Sum | AggregateOp::Avg => {
                        state.value.checked_add(v).ok_or_else(|| {
                            DbError::Overflow(format!("{} of {} and {}", op, state.value, v))
                        })?
                    }
                    AggregateOp::Count => state.value,
                };
                state.count += 1;
            }
            Accumulator::Text(groups) => {
                *groups.entry(group).or_insert(0) += 1;
            }
        }
        Ok(())
    }

    /// Final value per group, in first-seen order.
    fn finish(self, op: AggregateOp) -> Vec<(Option<Value>, i64)> {
        match self {
            Accumulator::Integer(groups) => groups
                .into_iter()
                .map(|(group, state)| {
                    let result = match op {
                        AggregateOp::Count => state.count,
                        AggregateOp::Avg => state.value / state.count,
                        _ => state.value,
                    };
                    (group, result)
                })
                .collect(),
            Accumulator::Text(groups) => groups.into_iter().collect(),
        }
    }
}

/// Computes one aggregate over a column of the child, optionally grouped by
/// another column.
///
/// The child is drained when the operator is opened. Output is one tuple
/// per group with the group value followed by the aggregate, or just the
/// aggregate when ungrouped. The aggregate column is a `BigInt` named
/// `op(column)`. Avg uses integer division. An empty input yields no rows.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggregateOp,
    schema: Arc<Schema>,
    results: Vec<Tuple>,
    cursor: Option<usize>,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let child_schema = child.schema();
        let agg_column = child_schema
            .column(agg_field)
            .ok_or_else(|| DbError::SchemaMismatch(format!("no column {}", agg_field)))?;
        // Rejects unsupported ops up front.
        Accumulator::new(agg_column.data_type(), op)?;

        let mut columns = Vec::with_capacity(2);
        if let Some(group_field) = group_field {
            let group_column = child_schema.column(group_field).ok_or_else(|| {
                DbError::SchemaMismatch(format!("no column {}", group_field))
            })?;
            columns.push(Column::new(group_column.name(), *group_column.data_type()));
        }
        columns.push(Column::new(
            format!("{}({})", op, agg_column.name()),
            DataType::BigInt,
        ));

        Ok(Self {
            schema: Arc::new(Schema::new(columns)),
            child,
            agg_field,
            group_field,
            op,
            results: Vec::new(),
            cursor: None,
        })
    }

    pub fn agg_field(&self) -> usize {
        self.agg_field
    }

    pub fn group_field(&self) -> Option<usize> {
        self.group_field
    }

    pub fn op(&self) -> AggregateOp {
        self.op
    }

    fn compute(&mut self) -> Result<Vec<Tuple>> {
        let agg_type = *self
            .child
            .schema()
            .column(self.agg_field)
            .ok_or_else(|| DbError::SchemaMismatch(format!("no column {}", self.agg_field)))?
            .data_type();
        let mut accumulator = Accumulator::new(&agg_type, self.op)?;

        while self.child.has_next()? {
            let tuple = self.child.next()?;
            let value = tuple.value(self.agg_field).ok_or_else(|| {
                DbError::SchemaMismatch(format!("no column {}", self.agg_field))
            })?;
            let group = match self.group_field {
                Some(field) => Some(tuple.value(field).cloned().ok_or_else(|| {
                    DbError::SchemaMismatch(format!("no column {}", field))
                })?),
                None => None,
            };
            accumulator.merge(self.op, group, value)?;
        }

        accumulator
            .finish(self.op)
            .into_iter()
            .map(|(group, result)| {
                let mut values = Vec::with_capacity(2);
                values.extend(group);
                values.push(Value::BigInt(result));
                Tuple::new(Arc::clone(&self.schema), values)
            })
            .collect()
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.results = self.compute()?;
        self.cursor = Some(0);
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self
            .cursor
            .map_or(false, |cursor| cursor < self.results.len()))
    }

    fn next(&mut self) -> Result<Tuple> {
        let cursor = self.cursor.ok_or(DbError::NoSuchElement)?;
        let tuple = self
            .results
            .get(cursor)
            .cloned()
            .ok_or(DbError::NoSuchElement)?;
        self.cursor = Some(cursor + 1);
        Ok(tuple)
    }

    /// Replays the computed groups without re-reading the child.
    fn rewind(&mut self) -> Result<()> {
        if self.cursor.is_some() {
            self.cursor = Some(0);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.results.clear();
        self.cursor = None;
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}
