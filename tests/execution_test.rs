//! Integration tests for the query operators over heap files

use std::sync::Arc;

use heapstore::buffer::BufferPool;
use heapstore::catalog::Catalog;
use heapstore::concurrency::{Transaction, TransactionState};
use heapstore::execution::{
    collect_tuples, Aggregate, AggregateOp, Filter, Join, JoinPredicate, OpIterator, Predicate,
    PredicateOp, SeqScan,
};
use heapstore::storage::heap::{DbFile, HeapFile};
use heapstore::tuple::{DataType, Schema, TupleBuilder, Value};
use heapstore::{DbError, StorageConfig, TableId};
use tempfile::TempDir;

struct Db {
    pool: Arc<BufferPool>,
    employees: TableId,
    departments: TableId,
    _dir: TempDir,
}

/// Two committed tables:
/// employees(id, name, dept, salary) and departments(id, title).
fn create_db() -> Db {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::default().with_page_size(256);

    let emp_schema = Schema::builder()
        .column("id", DataType::Integer)
        .column("name", DataType::Char(10))
        .column("dept", DataType::Integer)
        .column("salary", DataType::Integer)
        .build_arc();
    let dept_schema = Schema::builder()
        .column("id", DataType::Integer)
        .column("title", DataType::Char(12))
        .build_arc();

    let emp_file = Arc::new(
        HeapFile::open(dir.path().join("employees.dat"), emp_schema.clone(), &config).unwrap(),
    );
    let dept_file = Arc::new(
        HeapFile::open(dir.path().join("departments.dat"), dept_schema.clone(), &config)
            .unwrap(),
    );

    let catalog = Arc::new(Catalog::new());
    catalog.add_table(emp_file.clone(), "employees");
    catalog.add_table(dept_file.clone(), "departments");
    let pool = Arc::new(BufferPool::new(config, catalog).unwrap());

    let employees: [(i32, &str, i32, i32); 6] = [
        (1, "ana", 10, 120),
        (2, "bruno", 20, 90),
        (3, "carla", 10, 150),
        (4, "duarte", 30, 70),
        (5, "eva", 20, 110),
        (6, "filipe", 10, 95),
    ];
    let departments: [(i32, &str); 3] = [(10, "engineering"), (20, "sales"), (40, "legal")];

    let mut txn = Transaction::new();
    for (id, name, dept, salary) in employees {
        let mut tuple = TupleBuilder::new(emp_schema.clone())
            .value(id)
            .value(name)
            .value(dept)
            .value(salary)
            .build()
            .unwrap();
        pool.insert_tuple(txn.id(), emp_file.id(), &mut tuple).unwrap();
    }
    for (id, title) in departments {
        let mut tuple = TupleBuilder::new(dept_schema.clone())
            .value(id)
            .value(title)
            .build()
            .unwrap();
        pool.insert_tuple(txn.id(), dept_file.id(), &mut tuple).unwrap();
    }
    txn.commit(&pool).unwrap();
    assert_eq!(txn.state(), TransactionState::Committed);

    Db {
        pool,
        employees: emp_file.id(),
        departments: dept_file.id(),
        _dir: dir,
    }
}

fn int(v: &Value) -> i64 {
    v.as_i64().unwrap()
}

#[test]
fn test_seq_scan_prefixes_columns() {
    let db = create_db();
    let txn = Transaction::new();
    let mut scan = SeqScan::new(db.pool.clone(), txn.id(), db.employees, "e").unwrap();

    assert_eq!(scan.table_name().unwrap(), "employees");
    assert_eq!(scan.schema().column(3).unwrap().name(), "e.salary");
    assert_eq!(scan.schema().column_index("e.name"), Some(1));

    scan.open().unwrap();
    let tuples = collect_tuples(&mut scan).unwrap();
    assert_eq!(tuples.len(), 6);
    assert!(tuples.iter().all(|t| t.record_id().is_some()));
    assert_eq!(tuples[0].value_by_name("e.name"), Some(&Value::from("ana")));

    scan.rewind().unwrap();
    assert_eq!(collect_tuples(&mut scan).unwrap().len(), 6);
}

#[test]
fn test_seq_scan_reset_and_closed_state() {
    let db = create_db();
    let txn = Transaction::new();
    let mut scan = SeqScan::new(db.pool.clone(), txn.id(), db.employees, "e").unwrap();

    assert!(!scan.has_next().unwrap());
    assert!(matches!(scan.next(), Err(DbError::NoSuchElement)));

    scan.reset(db.departments, "d").unwrap();
    assert_eq!(scan.alias(), "d");
    assert_eq!(scan.schema().column(1).unwrap().name(), "d.title");
    scan.open().unwrap();
    assert_eq!(collect_tuples(&mut scan).unwrap().len(), 3);

    assert!(matches!(
        SeqScan::new(db.pool.clone(), txn.id(), TableId(12345), "x"),
        Err(DbError::TableNotFound(_))
    ));
}

#[test]
fn test_filter_over_scan() {
    let db = create_db();
    let txn = Transaction::new();
    let scan = SeqScan::new(db.pool.clone(), txn.id(), db.employees, "e").unwrap();
    let mut filter = Filter::new(
        Predicate::new(3, PredicateOp::GreaterThanOrEq, 110i32),
        Box::new(scan),
    );

    filter.open().unwrap();
    let ids: Vec<i64> = collect_tuples(&mut filter)
        .unwrap()
        .iter()
        .map(|t| int(t.value(0).unwrap()))
        .collect();
    assert_eq!(ids, vec![1, 3, 5]);
    assert_eq!(filter.schema().column(0).unwrap().name(), "e.id");
}

#[test]
fn test_like_filter() {
    let db = create_db();
    let txn = Transaction::new();
    let scan = SeqScan::new(db.pool.clone(), txn.id(), db.employees, "e").unwrap();
    let mut filter = Filter::new(Predicate::new(1, PredicateOp::Like, "ar"), Box::new(scan));

    filter.open().unwrap();
    let names: Vec<Value> = collect_tuples(&mut filter)
        .unwrap()
        .iter()
        .map(|t| t.value(1).cloned().unwrap())
        .collect();
    assert_eq!(names, vec![Value::from("carla"), Value::from("duarte")]);
}

#[test]
fn test_join_employees_departments() {
    let db = create_db();
    let txn = Transaction::new();
    let employees = SeqScan::new(db.pool.clone(), txn.id(), db.employees, "e").unwrap();
    let departments = SeqScan::new(db.pool.clone(), txn.id(), db.departments, "d").unwrap();
    let mut join = Join::new(
        JoinPredicate::new(2, PredicateOp::Equals, 0),
        Box::new(employees),
        Box::new(departments),
    );

    assert_eq!(join.schema().column_count(), 6);
    assert_eq!(join.schema().column(5).unwrap().name(), "d.title");

    join.open().unwrap();
    let pairs: Vec<(i64, Value)> = collect_tuples(&mut join)
        .unwrap()
        .iter()
        .map(|t| (int(t.value(0).unwrap()), t.value(5).cloned().unwrap()))
        .collect();
    // Employee 4 works in a department that does not exist.
    assert_eq!(
        pairs,
        vec![
            (1, Value::from("engineering")),
            (2, Value::from("sales")),
            (3, Value::from("engineering")),
            (5, Value::from("sales")),
            (6, Value::from("engineering")),
        ]
    );
}

#[test]
fn test_grouped_aggregate_over_join_input() {
    let db = create_db();
    let txn = Transaction::new();
    let scan = SeqScan::new(db.pool.clone(), txn.id(), db.employees, "e").unwrap();
    let mut agg = Aggregate::new(Box::new(scan), 3, Some(2), AggregateOp::Avg).unwrap();

    assert_eq!(agg.schema().column(0).unwrap().name(), "e.dept");
    assert_eq!(agg.schema().column(1).unwrap().name(), "avg(e.salary)");

    agg.open().unwrap();
    let groups: Vec<(i64, i64)> = collect_tuples(&mut agg)
        .unwrap()
        .iter()
        .map(|t| (int(t.value(0).unwrap()), int(t.value(1).unwrap())))
        .collect();
    // (120 + 150 + 95) / 3 = 121, (90 + 110) / 2 = 100
    assert_eq!(groups, vec![(10, 121), (20, 100), (30, 70)]);
}

#[test]
fn test_delete_through_scan_then_abort() {
    let db = create_db();
    let mut txn = Transaction::new();
    let scan = SeqScan::new(db.pool.clone(), txn.id(), db.employees, "e").unwrap();
    let mut low_paid = Filter::new(
        Predicate::new(3, PredicateOp::LessThan, 100i32),
        Box::new(scan),
    );

    low_paid.open().unwrap();
    for tuple in collect_tuples(&mut low_paid).unwrap() {
        db.pool.delete_tuple(txn.id(), &tuple).unwrap();
    }
    low_paid.rewind().unwrap();
    assert!(!low_paid.has_next().unwrap());
    low_paid.close();
    txn.abort(&db.pool).unwrap();

    let reader = Transaction::new();
    let mut scan = SeqScan::new(db.pool.clone(), reader.id(), db.employees, "e").unwrap();
    scan.open().unwrap();
    assert_eq!(collect_tuples(&mut scan).unwrap().len(), 6);
}

#[test]
fn test_count_over_strings() {
    let db = create_db();
    let txn = Transaction::new();
    let scan = SeqScan::new(db.pool.clone(), txn.id(), db.departments, "d").unwrap();
    let mut count = Aggregate::new(Box::new(scan), 1, None, AggregateOp::Count).unwrap();

    count.open().unwrap();
    let rows = collect_tuples(&mut count).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value(0), Some(&Value::BigInt(3)));

    let scan = SeqScan::new(db.pool.clone(), txn.id(), db.departments, "d").unwrap();
    assert!(matches!(
        Aggregate::new(Box::new(scan), 1, None, AggregateOp::Max),
        Err(DbError::UnsupportedAggregate(_))
    ));
}
