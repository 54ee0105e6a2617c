use std::collections::HashMap;
use std::sync::Arc;

use super::DataType;

/// Represents a single column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    data_type: DataType,

    /// Column position in the schema (0-indexed)
    ordinal: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ordinal: 0, // Will be set by Schema
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Returns the column's ordinal position in the schema.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Returns the on-page size of this column in bytes.
    pub fn size(&self) -> usize {
        self.data_type.size()
    }
}

/// Represents the schema of a table, defining its columns and structure.
///
/// All column types are fixed width, so `tuple_size` is the exact number
/// of bytes every tuple of this schema occupies in a heap page slot.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Ordered list of columns
    columns: Vec<Column>,

    /// Map from column name to column index for fast lookup
    name_to_index: HashMap<String, usize>,

    /// Sum of all column sizes
    tuple_size: usize,
}

impl Schema {
    /// Creates a new schema from a list of columns.
    pub fn new(columns: Vec<Column>) -> Self {
        let mut columns = columns;
        let mut name_to_index = HashMap::new();
        let mut tuple_size = 0;

        for (i, col) in columns.iter_mut().enumerate() {
            col.ordinal = i;
            name_to_index.insert(col.name.clone(), i);
            tuple_size += col.size();
        }

        Self {
            columns,
            name_to_index,
            tuple_size,
        }
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Returns the index of the column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Returns the size in bytes of one serialized tuple.
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }

    /// True when both schemas encode tuples identically, ignoring names.
    pub fn same_layout(&self, other: &Schema) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.data_type == b.data_type)
    }

    /// Returns a copy of this schema with every column renamed `alias.name`.
    pub fn with_prefix(&self, alias: &str) -> Schema {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(format!("{}.{}", alias, c.name), c.data_type))
            .collect();
        Schema::new(columns)
    }

    /// Concatenates two schemas, `left` columns first.
    pub fn merge(left: &Schema, right: &Schema) -> Schema {
        let columns = left
            .columns
            .iter()
            .chain(right.columns.iter())
            .map(|c| Column::new(c.name.clone(), c.data_type))
            .collect();
        Schema::new(columns)
    }

    /// Creates a projection of this schema with only the specified columns.
    pub fn project(&self, column_indices: &[usize]) -> Option<Schema> {
        let columns: Option<Vec<Column>> = column_indices
            .iter()
            .map(|&i| self.columns.get(i).cloned())
            .collect();

        columns.map(Schema::new)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}

/// Builder for constructing schemas fluently.
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type));
        self
    }

    pub fn build(self) -> Schema {
        Schema::new(self.columns)
    }

    /// Builds the schema wrapped in an Arc for shared ownership.
    pub fn build_arc(self) -> Arc<Schema> {
        Arc::new(self.build())
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_schema() -> Schema {
        Schema::builder()
            .column("id", DataType::Integer)
            .column("name", DataType::Char(16))
            .column("active", DataType::Boolean)
            .build()
    }

    #[test]
    fn test_schema_creation() {
        let schema = create_test_schema();

        assert_eq!(schema.column_count(), 3);
        assert_eq!(schema.column(0).unwrap().name(), "id");
        assert_eq!(schema.column(1).unwrap().name(), "name");
        assert_eq!(schema.column(2).unwrap().name(), "active");
        for (i, col) in schema.columns().enumerate() {
            assert_eq!(col.ordinal(), i);
        }
    }

    #[test]
    fn test_tuple_size() {
        // 4 + (4 + 16) + 1
        assert_eq!(create_test_schema().tuple_size(), 25);
    }

    #[test]
    fn test_with_prefix() {
        let prefixed = create_test_schema().with_prefix("t");
        assert_eq!(prefixed.column(0).unwrap().name(), "t.id");
        assert_eq!(prefixed.column_index("t.name"), Some(1));
        assert_eq!(prefixed.column_index("name"), None);
        assert_eq!(prefixed.tuple_size(), 25);
    }

    #[test]
    fn test_same_layout_ignores_names() {
        let schema = create_test_schema();
        assert!(schema.same_layout(&schema.with_prefix("x")));
        assert!(!schema.same_layout(&schema.project(&[0, 1]).unwrap()));
    }

    #[test]
    fn test_merge() {
        let left = create_test_schema();
        let right = Schema::builder().column("score", DataType::BigInt).build();
        let merged = Schema::merge(&left, &right);

        assert_eq!(merged.column_count(), 4);
        assert_eq!(merged.column(3).unwrap().name(), "score");
        assert_eq!(merged.column(3).unwrap().ordinal(), 3);
        assert_eq!(merged.tuple_size(), 33);
    }

    #[test]
    fn test_projection() {
        let schema = create_test_schema();

        let projected = schema.project(&[0, 2]).unwrap();
        assert_eq!(projected.column_count(), 2);
        assert_eq!(projected.column(1).unwrap().name(), "active");
        assert!(schema.project(&[5]).is_none());
    }
}
