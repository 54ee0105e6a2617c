use std::sync::Arc;

use heapstore::buffer::BufferPool;
use heapstore::catalog::Catalog;
use heapstore::concurrency::Transaction;
use heapstore::execution::{
    collect_tuples, Aggregate, AggregateOp, Filter, OpIterator, Predicate, PredicateOp, SeqScan,
};
use heapstore::storage::heap::{DbFile, HeapFile};
use heapstore::tuple::{DataType, Schema, TupleBuilder};
use heapstore::StorageConfig;

fn main() {
    println!("Heapstore - a transactional heap-file storage engine");
    println!("====================================================\n");

    let db_path = "demo.dat";
    let config = StorageConfig::default().with_buffer_pool_pages(8);

    let schema = Schema::builder()
        .column("id", DataType::Integer)
        .column("city", DataType::Char(12))
        .column("population", DataType::Integer)
        .build_arc();

    let file = Arc::new(
        HeapFile::open(db_path, schema.clone(), &config).expect("Failed to open heap file"),
    );
    let catalog = Arc::new(Catalog::new());
    catalog.add_table(file.clone(), "cities");
    let pool = Arc::new(BufferPool::new(config, catalog).expect("Failed to create buffer pool"));
    println!("Opened table 'cities' as {}\n", file.id());

    // Load some rows in one transaction
    let rows = [
        ("Lisbon", 545),
        ("Porto", 232),
        ("Braga", 193),
        ("Coimbra", 106),
        ("Faro", 64),
    ];
    let mut txn = Transaction::new();
    for (i, (city, population)) in rows.iter().enumerate() {
        let mut tuple = TupleBuilder::new(schema.clone())
            .value(i as i32)
            .value(*city)
            .value(*population as i32)
            .build()
            .expect("Failed to build tuple");
        pool.insert_tuple(txn.id(), file.id(), &mut tuple)
            .expect("Failed to insert tuple");
        println!("Inserted {} at {:?}", tuple, tuple.record_id());
    }
    txn.commit(&pool).expect("Failed to commit");
    println!("\nCommitted {}", txn.id());

    // Scan with a filter
    let mut txn = Transaction::new();
    let scan = SeqScan::new(pool.clone(), txn.id(), file.id(), "c").expect("Failed to scan");
    let mut filter = Filter::new(
        Predicate::new(2, PredicateOp::GreaterThan, 150i32),
        Box::new(scan),
    );
    filter.open().expect("Failed to open filter");
    println!("\nCities above 150k:");
    for tuple in collect_tuples(&mut filter).expect("Scan failed") {
        println!("  - {}", tuple);
    }
    filter.close();

    // Total population
    let scan = SeqScan::new(pool.clone(), txn.id(), file.id(), "c").expect("Failed to scan");
    let mut total = Aggregate::new(Box::new(scan), 2, None, AggregateOp::Sum)
        .expect("Failed to build aggregate");
    total.open().expect("Failed to open aggregate");
    for tuple in collect_tuples(&mut total).expect("Aggregate failed") {
        println!("\n{}: {}", total.schema().column(0).map_or("?", |c| c.name()), tuple);
    }
    total.close();
    txn.commit(&pool).expect("Failed to commit");

    // Clean up
    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
}
