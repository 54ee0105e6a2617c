use std::cmp::Ordering;
use std::fmt;

use crate::tuple::{Tuple, Value};

/// Comparison applied by a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    /// Substring match on strings, equality on anything else
    Like,
    NotEquals,
}

impl PredicateOp {
    /// Evaluates `left op right`. Values of incomparable types are unequal
    /// and unordered.
    pub fn apply(&self, left: &Value, right: &Value) -> bool {
        if let (PredicateOp::Like, Value::String(l), Value::String(r)) = (self, left, right) {
            return l.contains(r.as_str());
        }

        let ordering = left.compare(right);
        match self {
            PredicateOp::Equals | PredicateOp::Like => ordering == Some(Ordering::Equal),
            PredicateOp::NotEquals => ordering != Some(Ordering::Equal),
            PredicateOp::GreaterThan => ordering == Some(Ordering::Greater),
            PredicateOp::LessThan => ordering == Some(Ordering::Less),
            PredicateOp::LessThanOrEq => {
                matches!(ordering, Some(Ordering::Less | Ordering::Equal))
            }
            PredicateOp::GreaterThanOrEq => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
        }
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            PredicateOp::Equals => "=",
            PredicateOp::GreaterThan => ">",
            PredicateOp::LessThan => "<",
            PredicateOp::LessThanOrEq => "<=",
            PredicateOp::GreaterThanOrEq => ">=",
            PredicateOp::Like => "LIKE",
            PredicateOp::NotEquals => "<>",
        };
        f.write_str(symbol)
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: PredicateOp,
    operand: Value,
}

impl Predicate {
    pub fn new(field: usize, op: PredicateOp, operand: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            operand: operand.into(),
        }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> PredicateOp {
        self.op
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    /// True if the tuple's field satisfies the comparison. A tuple without
    /// that field never does.
    pub fn filter(&self, tuple: &Tuple) -> bool {
        tuple
            .value(self.field)
            .map_or(false, |value| self.op.apply(value, &self.operand))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} {} {}", self.field, self.op, self.operand)
    }
}

/// Compares a field of one tuple against a field of another.
#[derive(Debug, Clone)]
pub struct JoinPredicate {
    field1: usize,
    op: PredicateOp,
    field2: usize,
}

impl JoinPredicate {
    pub fn new(field1: usize, op: PredicateOp, field2: usize) -> Self {
        Self { field1, op, field2 }
    }

    pub fn field1(&self) -> usize {
        self.field1
    }

    pub fn field2(&self) -> usize {
        self.field2
    }

    pub fn op(&self) -> PredicateOp {
        self.op
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        match (left.value(self.field1), right.value(self.field2)) {
            (Some(l), Some(r)) => self.op.apply(l, r),
            _ => false,
        }
    }
}
