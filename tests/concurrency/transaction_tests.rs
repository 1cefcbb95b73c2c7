use std::sync::{Arc, Barrier};
use std::thread;

use heapdb::common::config::TxnId;
use heapdb::common::exception::DbError;
use heapdb::concurrency::transaction::{Permissions, Transaction};
use heapdb::storage::page::heap_page::HeapPage;
use heapdb::storage::page::heap_page_id::HeapPageId;

use crate::common::tempdb::{scan_pairs, temp_db, two_int_schema, two_int_tuple, TestDb};

/// Seeds `n` empty pages on disk so transactions can lock them.
fn seed_pages(test_db: &TestDb, table_id: u64, n: usize, page_size: usize) {
    let file = test_db.db.get_catalog().get_database_file(table_id).unwrap();
    let schema = file.get_schema().clone();
    for page_no in 0..n {
        let pid = HeapPageId::new(table_id, page_no);
        let page =
            HeapPage::new(pid, &HeapPage::empty_page_data(page_size), schema.clone()).unwrap();
        file.write_page(&page).unwrap();
    }
}

#[test]
fn test_shared_readers_run_concurrently() {
    let test_db = temp_db(256, 10);
    let table_id = test_db.open_table("readers", two_int_schema());
    seed_pages(&test_db, table_id, 1, 256);
    let pool = test_db.db.get_buffer_pool();

    let pid = HeapPageId::new(table_id, 0);
    let t1 = Transaction::new().get_id();
    let t2 = Transaction::new().get_id();
    let _ = pool.get_page(t1, pid, Permissions::ReadOnly).unwrap();
    let _ = pool.get_page(t2, pid, Permissions::ReadOnly).unwrap();
    assert!(pool.holds_lock(t1, pid));
    assert!(pool.holds_lock(t2, pid));

    pool.transaction_complete(t1, true).unwrap();
    pool.transaction_complete(t2, true).unwrap();
}

#[test]
fn test_lock_upgrade_through_pool() {
    let test_db = temp_db(256, 10);
    let table_id = test_db.open_table("upgrade", two_int_schema());
    seed_pages(&test_db, table_id, 1, 256);
    let pool = test_db.db.get_buffer_pool();

    let pid = HeapPageId::new(table_id, 0);
    let tid = Transaction::new().get_id();
    let _ = pool.get_page(tid, pid, Permissions::ReadOnly).unwrap();
    let _ = pool.get_page(tid, pid, Permissions::ReadWrite).unwrap();
    assert!(pool.holds_lock(tid, pid));
    pool.transaction_complete(tid, true).unwrap();
}

#[test]
fn test_writer_blocks_reader_until_commit() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("block", schema.clone());
    seed_pages(&test_db, table_id, 1, 256);
    let pool = test_db.db.get_buffer_pool().clone();

    let writer = Transaction::new().get_id();
    let mut tuple = two_int_tuple(&schema, 42, 43);
    pool.insert_tuple(writer, table_id, &mut tuple).unwrap();

    let reader = Transaction::new().get_id();
    let reader_pool = pool.clone();
    let handle = thread::spawn(move || {
        let pid = HeapPageId::new(table_id, 0);
        // Blocks until the writer commits, then observes its insert.
        let page = reader_pool
            .get_page(reader, pid, Permissions::ReadOnly)
            .unwrap();
        let count = page.read().iter().count();
        reader_pool.transaction_complete(reader, true).unwrap();
        count
    });

    // Give the reader time to start polling, then commit.
    thread::sleep(std::time::Duration::from_millis(20));
    pool.transaction_complete(writer, true).unwrap();

    assert_eq!(handle.join().unwrap(), 1);
}

#[test]
fn test_deadlock_aborts_exactly_one_victim() {
    let test_db = temp_db(256, 10);
    let table_id = test_db.open_table("deadlock", two_int_schema());
    seed_pages(&test_db, table_id, 2, 256);
    let pool = test_db.db.get_buffer_pool().clone();

    let p0 = HeapPageId::new(table_id, 0);
    let p1 = HeapPageId::new(table_id, 1);
    let barrier = Arc::new(Barrier::new(2));

    let worker = |tid: TxnId, mine: HeapPageId, theirs: HeapPageId| {
        let pool = pool.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            pool.get_page(tid, mine, Permissions::ReadWrite).unwrap();
            barrier.wait();
            match pool.get_page(tid, theirs, Permissions::ReadWrite) {
                Ok(_) => {
                    pool.transaction_complete(tid, true).unwrap();
                    true
                }
                Err(DbError::Abort(e)) => {
                    assert_eq!(e.txn_id, tid);
                    pool.transaction_complete(tid, false).unwrap();
                    false
                }
                Err(e) => panic!("unexpected error {:?}", e),
            }
        })
    };

    let t1 = Transaction::new().get_id();
    let t2 = Transaction::new().get_id();
    let h1 = worker(t1, p0, p1);
    let h2 = worker(t2, p1, p0);
    let first_won = h1.join().unwrap();
    let second_won = h2.join().unwrap();

    // Exactly one commits; the survivor completed both acquires.
    assert!(first_won ^ second_won);
}

#[test]
fn test_committed_writes_visible_to_later_transactions() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("visible", schema.clone());
    let pool = test_db.db.get_buffer_pool();

    let t1 = Transaction::new().get_id();
    let mut tuple = two_int_tuple(&schema, 7, 8);
    pool.insert_tuple(t1, table_id, &mut tuple).unwrap();
    pool.transaction_complete(t1, true).unwrap();

    let t2 = Transaction::new().get_id();
    assert_eq!(scan_pairs(&test_db, table_id, t2), vec![(7, 8)]);
    pool.transaction_complete(t2, true).unwrap();
}

#[test]
fn test_concurrent_inserters_all_land() {
    let test_db = temp_db(4096, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("many", schema.clone());
    seed_pages(&test_db, table_id, 1, 4096);
    let pool = test_db.db.get_buffer_pool().clone();

    let mut handles = Vec::new();
    for worker_id in 0..4 {
        let pool = pool.clone();
        let schema = schema.clone();
        handles.push(thread::spawn(move || {
            let tid = Transaction::new().get_id();
            for i in 0..5 {
                let mut tuple = two_int_tuple(&schema, worker_id, i);
                pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
            }
            pool.transaction_complete(tid, true).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let tid = Transaction::new().get_id();
    assert_eq!(scan_pairs(&test_db, table_id, tid).len(), 20);
}
