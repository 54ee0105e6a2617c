//! Pull-based query operators.
//!
//! Every operator implements [`OpIterator`] and pulls tuples from its
//! children. Leaves are [`SeqScan`] over a heap file or [`TupleIterator`]
//! over an in-memory list.

mod aggregate;
mod filter;
mod join;
mod op_iterator;
mod predicate;
mod seq_scan;

pub use aggregate::*;
pub use filter::*;
pub use join::*;
pub use op_iterator::*;
pub use predicate::*;
pub use seq_scan::*;
