mod data_type;
mod schema;
mod tuple;
mod value;

pub use data_type::{DataType, CHAR_LENGTH_PREFIX};
pub use schema::{Column, Schema, SchemaBuilder};
pub use tuple::{Tuple, TupleBuilder};
pub use value::Value;
