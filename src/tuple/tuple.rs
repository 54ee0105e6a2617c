use std::fmt;
use std::sync::Arc;

use bytes::BufMut;

use super::{Schema, Value};
use crate::common::{DbError, RecordId, Result};

/// Represents a single row/tuple in a table.
///
/// A tuple contains a list of values corresponding to the columns defined in
/// its schema, plus the location it was stored at once it lives in a heap
/// page.
///
/// ## Tuple Binary Format
///
/// ```text
/// +-----------+-----------+-----+-----------+
/// | Column 0  | Column 1  | ... | Column N  |
/// +-----------+-----------+-----+-----------+
/// ```
///
/// Every column is written at its fixed width (see `DataType::size`), so the
/// encoded length is always `schema.tuple_size()`.
#[derive(Debug, Clone)]
pub struct Tuple {
    /// The schema defining the structure of this tuple
    schema: Arc<Schema>,

    /// The values for each column (in schema order)
    values: Vec<Value>,

    /// Where this tuple is stored, if it has been inserted
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a new tuple, checking the values against the schema.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self> {
        if values.len() != schema.column_count() {
            return Err(DbError::SchemaMismatch(format!(
                "expected {} values, got {}",
                schema.column_count(),
                values.len()
            )));
        }
        for (col, value) in schema.columns().zip(values.iter()) {
            if !value.matches_type(col.data_type()) {
                return Err(DbError::SchemaMismatch(format!(
                    "column {} of type {} cannot hold {}",
                    col.name(),
                    col.data_type(),
                    value
                )));
            }
        }
        Ok(Self {
            schema,
            values,
            record_id: None,
        })
    }

    /// Decodes a tuple from exactly `schema.tuple_size()` bytes.
    pub fn from_bytes(schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        let mut buf = data;
        let mut values = Vec::with_capacity(schema.column_count());
        for col in schema.columns() {
            values.push(Value::deserialize(&mut buf, col.data_type())?);
        }
        Ok(Self {
            schema,
            values,
            record_id: None,
        })
    }

    /// Returns the schema of this tuple.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the value at the given column index.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value for the given column name.
    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.schema
            .column_index(name)
            .and_then(|i| self.values.get(i))
    }

    /// Returns all values in this tuple.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the stored location, if this tuple came from or went to a page.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Writes the encoded tuple into `out`, which must be `tuple_size()` bytes.
    pub fn write_to(&self, out: &mut [u8]) -> Result<()> {
        if out.len() != self.schema.tuple_size() {
            return Err(DbError::SchemaMismatch(format!(
                "slot is {} bytes, tuple needs {}",
                out.len(),
                self.schema.tuple_size()
            )));
        }
        let mut buf = out;
        self.serialize_into(&mut buf)
    }

    /// Serializes the tuple to bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.schema.tuple_size());
        self.serialize_into(&mut bytes)?;
        Ok(bytes)
    }

    fn serialize_into<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        for (col, value) in self.schema.columns().zip(self.values.iter()) {
            value.serialize(col.data_type(), buf)?;
        }
        Ok(())
    }

    /// Re-labels this tuple with a schema of the same layout, keeping its
    /// record id.
    pub fn with_schema(self, schema: Arc<Schema>) -> Result<Tuple> {
        if !self.schema.same_layout(&schema) {
            return Err(DbError::SchemaMismatch(
                "schemas have different column types".to_string(),
            ));
        }
        Ok(Tuple {
            schema,
            values: self.values,
            record_id: self.record_id,
        })
    }

    /// Concatenates two tuples into one described by `schema`.
    pub fn merge(left: &Tuple, right: &Tuple, schema: Arc<Schema>) -> Result<Tuple> {
        let values = left
            .values
            .iter()
            .chain(right.values.iter())
            .cloned()
            .collect();
        Tuple::new(schema, values)
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.values == other.values
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
        write!(f, "({})", rendered.join(", "))
    }
}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl TupleBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        let count = schema.column_count();
        Self {
            schema,
            values: Vec::with_capacity(count),
        }
    }

    /// Appends the value for the next column.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn build(self) -> Result<Tuple> {
        Tuple::new(self.schema, self.values)
    }
}
