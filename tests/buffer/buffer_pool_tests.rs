use heapdb::concurrency::transaction::{Permissions, Transaction};
use heapdb::storage::page::heap_page::HeapPage;
use heapdb::storage::page::heap_page_id::HeapPageId;

use crate::common::tempdb::{scan_pairs, temp_db, two_int_schema, two_int_tuple};

#[test]
fn test_cache_hit_returns_same_page() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("hit", schema.clone());
    let pool = test_db.db.get_buffer_pool();

    let tid = Transaction::new().get_id();
    let mut tuple = two_int_tuple(&schema, 1, 2);
    pool.insert_tuple(tid, table_id, &mut tuple).unwrap();

    let pid = HeapPageId::new(table_id, 0);
    let first = pool.get_page(tid, pid, Permissions::ReadOnly).unwrap();
    let second = pool.get_page(tid, pid, Permissions::ReadOnly).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    pool.transaction_complete(tid, true).unwrap();
}

#[test]
fn test_eviction_respects_capacity_and_keeps_data() {
    // 7 slots per 64-byte page; 30 tuples span 5 pages against a 3-page pool,
    // so scans force STEAL eviction of pages the transaction itself dirtied.
    let test_db = temp_db(64, 3);
    let schema = two_int_schema();
    let table_id = test_db.open_table("evict", schema.clone());
    let pool = test_db.db.get_buffer_pool();

    let tid = Transaction::new().get_id();
    for i in 0..30 {
        let mut tuple = two_int_tuple(&schema, i, i * 2);
        pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
    }
    assert!(pool.get_num_cached() <= pool.get_capacity());

    let mut scanned = scan_pairs(&test_db, table_id, tid);
    scanned.sort_unstable();
    let expected: Vec<(i32, i32)> = (0..30).map(|i| (i, i * 2)).collect();
    assert_eq!(scanned, expected);
    pool.transaction_complete(tid, true).unwrap();
}

#[test]
fn test_eviction_writes_log_record_before_page() {
    let test_db = temp_db(64, 2);
    let schema = two_int_schema();
    let table_id = test_db.open_table("wal", schema.clone());
    let pool = test_db.db.get_buffer_pool();
    let log = test_db.db.get_log_manager();

    let tid = Transaction::new().get_id();
    for i in 0..20 {
        let mut tuple = two_int_tuple(&schema, i, i);
        pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
    }
    // Dirty pages were stolen from a 2-page pool, each with a log record.
    assert!(log.get_num_records() > 0);
    pool.transaction_complete(tid, true).unwrap();
}

#[test]
fn test_commit_forces_log_and_updates_before_image() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("commit", schema.clone());
    let pool = test_db.db.get_buffer_pool();
    let log = test_db.db.get_log_manager();

    let tid = Transaction::new().get_id();
    let mut tuple = two_int_tuple(&schema, 5, 6);
    pool.insert_tuple(tid, table_id, &mut tuple).unwrap();

    let forces_before = log.get_num_forces();
    pool.transaction_complete(tid, true).unwrap();
    assert!(log.get_num_forces() > forces_before);

    // After commit the page's before-image is its committed contents, so a
    // later abort by another transaction rolls back to them.
    let pid = HeapPageId::new(table_id, 0);
    let t2 = Transaction::new().get_id();
    let page = pool.get_page(t2, pid, Permissions::ReadWrite).unwrap();
    let committed = page.read().get_page_data();
    assert_eq!(page.read().get_before_image(), committed);
    pool.transaction_complete(t2, true).unwrap();
}

#[test]
fn test_abort_rolls_back_to_disk_state() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("abort", schema.clone());
    let pool = test_db.db.get_buffer_pool();
    let file = test_db.db.get_catalog().get_database_file(table_id).unwrap();

    // Seed one empty page on disk so the insert dirties a cached page
    // instead of appending a new one.
    let pid = HeapPageId::new(table_id, 0);
    let empty = HeapPage::new(pid, &HeapPage::empty_page_data(256), schema.clone()).unwrap();
    file.write_page(&empty).unwrap();
    let disk_before = HeapPage::empty_page_data(256);

    let t1 = Transaction::new().get_id();
    let mut tuple = two_int_tuple(&schema, 9, 9);
    pool.insert_tuple(t1, table_id, &mut tuple).unwrap();
    {
        let page = pool.get_page(t1, pid, Permissions::ReadOnly).unwrap();
        assert_eq!(page.read().is_dirty(), Some(t1));
    }
    pool.transaction_complete(t1, false).unwrap();

    // The tuple is gone and the page matches its pre-transaction bytes.
    let t2 = Transaction::new().get_id();
    assert_eq!(scan_pairs(&test_db, table_id, t2), Vec::new());
    let page = pool.get_page(t2, pid, Permissions::ReadOnly).unwrap();
    assert_eq!(page.read().get_page_data(), disk_before);
    assert_eq!(page.read().is_dirty(), None);
    pool.transaction_complete(t2, true).unwrap();
}

#[test]
fn test_abort_releases_all_locks() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("locks", schema.clone());
    let pool = test_db.db.get_buffer_pool();

    let t1 = Transaction::new().get_id();
    let mut tuple = two_int_tuple(&schema, 1, 1);
    pool.insert_tuple(t1, table_id, &mut tuple).unwrap();

    let pid = HeapPageId::new(table_id, 0);
    assert!(pool.holds_lock(t1, pid));
    pool.transaction_complete(t1, false).unwrap();
    assert!(!pool.holds_lock(t1, pid));

    // Another transaction can take the write lock immediately.
    let t2 = Transaction::new().get_id();
    let _ = pool.get_page(t2, pid, Permissions::ReadWrite).unwrap();
    pool.transaction_complete(t2, true).unwrap();
}

#[test]
fn test_flush_all_then_reopen_sees_committed_data() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("durable", schema.clone());
    let pool = test_db.db.get_buffer_pool();

    let tid = Transaction::new().get_id();
    for i in 0..3 {
        let mut tuple = two_int_tuple(&schema, i, 100 + i);
        pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
    }
    pool.transaction_complete(tid, true).unwrap();
    pool.flush_all_pages().unwrap();

    // A second engine over the same backing file sees the committed rows.
    let file = test_db.db.get_catalog().get_database_file(table_id).unwrap();
    let reread = file.read_page(HeapPageId::new(table_id, 0)).unwrap();
    let values: Vec<i32> = reread
        .iter()
        .map(|t| match t.get_field(0) {
            heapdb::types::field::Field::Int(v) => *v,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(values, vec![0, 1, 2]);
}

#[test]
fn test_discard_page_drops_cache_entry() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("discard", schema.clone());
    let pool = test_db.db.get_buffer_pool();

    let tid = Transaction::new().get_id();
    let mut tuple = two_int_tuple(&schema, 1, 1);
    pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
    assert_eq!(pool.get_num_cached(), 1);

    pool.discard_page(HeapPageId::new(table_id, 0));
    assert_eq!(pool.get_num_cached(), 0);
    pool.transaction_complete(tid, true).unwrap();
}
