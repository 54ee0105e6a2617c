use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::common::{DbError, Result, TableId};
use crate::storage::heap::DbFile;
use crate::tuple::Schema;

#[derive(Clone)]
struct TableEntry {
    name: String,
    file: Arc<dyn DbFile>,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<TableId, TableEntry>,
    by_name: HashMap<String, TableId>,
}

/// Registry of the tables known to a buffer pool.
///
/// Maps table ids to their backing files, and table names to ids.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<Tables>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` under `name`. An existing table with the same name
    /// or the same id is replaced.
    pub fn add_table(&self, file: Arc<dyn DbFile>, name: impl Into<String>) {
        let name = name.into();
        let table_id = file.id();
        let mut tables = self.tables.write();

        if let Some(old_id) = tables.by_name.remove(&name) {
            tables.by_id.remove(&old_id);
        }
        if let Some(old) = tables.by_id.remove(&table_id) {
            tables.by_name.remove(&old.name);
        }

        debug!("registered table {} as {}", name, table_id);
        tables.by_name.insert(name.clone(), table_id);
        tables.by_id.insert(table_id, TableEntry { name, file });
    }

    pub fn file(&self, table_id: TableId) -> Result<Arc<dyn DbFile>> {
        self.tables
            .read()
            .by_id
            .get(&table_id)
            .map(|entry| Arc::clone(&entry.file))
            .ok_or(DbError::TableNotFound(table_id))
    }

    pub fn schema(&self, table_id: TableId) -> Result<Arc<Schema>> {
        Ok(self.file(table_id)?.schema().clone())
    }

    pub fn table_name(&self, table_id: TableId) -> Result<String> {
        self.tables
            .read()
            .by_id
            .get(&table_id)
            .map(|entry| entry.name.clone())
            .ok_or(DbError::TableNotFound(table_id))
    }

    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.tables
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| DbError::TableNameNotFound(name.to_string()))
    }

    /// Registered table ids in ascending order.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.read().by_id.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_id.clear();
        tables.by_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::StorageConfig;
    use crate::storage::heap::HeapFile;
    use crate::tuple::DataType;
    use tempfile::TempDir;

    fn heap_file(dir: &TempDir, file_name: &str, id: u32) -> Arc<HeapFile> {
        let schema = Schema::builder()
            .column("id", DataType::Integer)
            .build_arc();
        Arc::new(
            HeapFile::with_table_id(
                dir.path().join(file_name),
                TableId::new(id),
                schema,
                &StorageConfig::default(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::new();
        catalog.add_table(heap_file(&dir, "a.dat", 1), "a");
        catalog.add_table(heap_file(&dir, "b.dat", 2), "b");

        assert_eq!(catalog.table_id("b").unwrap(), TableId::new(2));
        assert_eq!(catalog.table_name(TableId::new(1)).unwrap(), "a");
        assert_eq!(catalog.file(TableId::new(2)).unwrap().id(), TableId::new(2));
        assert_eq!(catalog.schema(TableId::new(1)).unwrap().column_count(), 1);
        assert_eq!(catalog.table_ids(), vec![TableId::new(1), TableId::new(2)]);
    }

    #[test]
    fn test_unknown_table() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.file(TableId::new(9)),
            Err(DbError::TableNotFound(_))
        ));
        assert!(matches!(
            catalog.table_id("missing"),
            Err(DbError::TableNameNotFound(_))
        ));
    }

    #[test]
    fn test_same_name_replaces() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::new();
        catalog.add_table(heap_file(&dir, "a.dat", 1), "t");
        catalog.add_table(heap_file(&dir, "b.dat", 2), "t");

        assert_eq!(catalog.table_id("t").unwrap(), TableId::new(2));
        assert_eq!(catalog.table_ids(), vec![TableId::new(2)]);
    }

    #[test]
    fn test_same_id_replaces() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::new();
        catalog.add_table(heap_file(&dir, "a.dat", 1), "old");
        catalog.add_table(heap_file(&dir, "a.dat", 1), "new");

        assert!(catalog.table_id("old").is_err());
        assert_eq!(catalog.table_name(TableId::new(1)).unwrap(), "new");
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::new();
        catalog.add_table(heap_file(&dir, "a.dat", 1), "a");
        catalog.clear();
        assert!(catalog.table_ids().is_empty());
    }
}
