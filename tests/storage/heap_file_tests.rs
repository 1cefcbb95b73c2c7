use heapdb::common::exception::DbError;
use heapdb::concurrency::transaction::Transaction;
use heapdb::storage::page::heap_page::HeapPage;
use heapdb::storage::page::heap_page_id::HeapPageId;

use crate::common::tempdb::{scan_pairs, temp_db, two_int_schema, two_int_tuple};

#[test]
fn test_empty_file_scans_nothing() {
    let test_db = temp_db(256, 10);
    let table_id = test_db.open_table("empty", two_int_schema());
    let tid = Transaction::new().get_id();
    assert_eq!(scan_pairs(&test_db, table_id, tid), Vec::new());
}

#[test]
fn test_single_empty_page_scans_nothing() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("blank", schema.clone());
    let file = test_db.db.get_catalog().get_database_file(table_id).unwrap();

    let pid = HeapPageId::new(table_id, 0);
    let page = HeapPage::new(pid, &HeapPage::empty_page_data(256), schema).unwrap();
    file.write_page(&page).unwrap();
    assert_eq!(file.num_pages().unwrap(), 1);

    let tid = Transaction::new().get_id();
    assert_eq!(scan_pairs(&test_db, table_id, tid), Vec::new());
}

#[test]
fn test_insert_then_scan_in_order() {
    let test_db = temp_db(4096, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("t", schema.clone());
    let pool = test_db.db.get_buffer_pool();

    let t1 = Transaction::new().get_id();
    for (a, b) in [(1, 10), (2, 20), (3, 30)] {
        let mut tuple = two_int_tuple(&schema, a, b);
        pool.insert_tuple(t1, table_id, &mut tuple).unwrap();
        assert!(tuple.get_record_id().is_some());
    }
    pool.transaction_complete(t1, true).unwrap();

    let t2 = Transaction::new().get_id();
    assert_eq!(
        scan_pairs(&test_db, table_id, t2),
        vec![(1, 10), (2, 20), (3, 30)]
    );
}

#[test]
fn test_file_grows_page_by_page() {
    // 8-byte tuples on 64-byte pages: 7 slots per page.
    let test_db = temp_db(64, 20);
    let schema = two_int_schema();
    let table_id = test_db.open_table("grow", schema.clone());
    let pool = test_db.db.get_buffer_pool();
    let file = test_db.db.get_catalog().get_database_file(table_id).unwrap();

    let tid = Transaction::new().get_id();
    for i in 0..20 {
        let mut tuple = two_int_tuple(&schema, i, -i);
        pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
    }
    assert_eq!(file.num_pages().unwrap(), 3);

    let scanned = scan_pairs(&test_db, table_id, tid);
    assert_eq!(scanned.len(), 20);
    pool.transaction_complete(tid, true).unwrap();
}

#[test]
fn test_delete_frees_slot_for_reuse() {
    let test_db = temp_db(4096, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("del", schema.clone());
    let pool = test_db.db.get_buffer_pool();

    let tid = Transaction::new().get_id();
    let mut keep = two_int_tuple(&schema, 1, 1);
    let mut victim = two_int_tuple(&schema, 2, 2);
    pool.insert_tuple(tid, table_id, &mut keep).unwrap();
    pool.insert_tuple(tid, table_id, &mut victim).unwrap();

    pool.delete_tuple(tid, &victim).unwrap();
    assert_eq!(scan_pairs(&test_db, table_id, tid), vec![(1, 1)]);

    let mut replacement = two_int_tuple(&schema, 3, 3);
    pool.insert_tuple(tid, table_id, &mut replacement).unwrap();
    assert_eq!(
        replacement.get_record_id().unwrap().get_slot(),
        victim.get_record_id().unwrap().get_slot()
    );
    pool.transaction_complete(tid, true).unwrap();
}

#[test]
fn test_read_page_out_of_range() {
    let test_db = temp_db(256, 10);
    let table_id = test_db.open_table("short", two_int_schema());
    let file = test_db.db.get_catalog().get_database_file(table_id).unwrap();

    let result = file.read_page(HeapPageId::new(table_id, 5));
    assert!(matches!(result, Err(DbError::PageNotFound(_))));
}

#[test]
fn test_table_id_is_stable() {
    let test_db = temp_db(256, 10);
    let schema = two_int_schema();
    let first = test_db.open_table("stable", schema.clone());
    // Re-registering the same path yields the same id.
    let second = test_db.open_table("stable", schema);
    assert_eq!(first, second);
}

#[test]
fn test_iterator_rewind_restarts_scan() {
    let test_db = temp_db(4096, 10);
    let schema = two_int_schema();
    let table_id = test_db.open_table("rw", schema.clone());
    let pool = test_db.db.get_buffer_pool();

    let tid = Transaction::new().get_id();
    for i in 0..4 {
        let mut tuple = two_int_tuple(&schema, i, i);
        pool.insert_tuple(tid, table_id, &mut tuple).unwrap();
    }

    let file = test_db.db.get_catalog().get_database_file(table_id).unwrap();
    let mut iter = heapdb::storage::table::heap_file::HeapFileIterator::new(
        file,
        pool.clone(),
        tid,
    );
    iter.open().unwrap();
    let _ = iter.next().unwrap();
    let _ = iter.next().unwrap();
    iter.rewind().unwrap();

    let mut count = 0;
    while iter.has_next().unwrap() {
        let _ = iter.next().unwrap();
        count += 1;
    }
    assert_eq!(count, 4);

    iter.close();
    assert!(!iter.has_next().unwrap());
    assert!(matches!(iter.next(), Err(DbError::NoSuchElement)));
    pool.transaction_complete(tid, true).unwrap();
}
