use crate::*;
use reftable_config::StackError;
use reftable_record::{LogRecord, LogUpdate, RefRecord};
use tempfile::tempdir;

#[test]
fn empty_writer_discards_tmp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("0000000000000001-0000000000000001-0.tmp");
    let w = TableWriter::create(&path, 0x7368_6131, false).unwrap();
    let finished = w.finish().unwrap();
    assert_eq!(finished.record_count, 0);
    assert!(finished.path.is_none());
    assert!(!path.exists());
}

#[test]
fn add_ref_requires_limits_first() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.tmp");
    let mut w = TableWriter::create(&path, 0x7368_6131, false).unwrap();
    let err = w.add_ref(&RefRecord::value("refs/heads/main", 1, vec![1; 20])).unwrap_err();
    assert!(matches!(err, StackError::Api(_)));
}

#[test]
fn add_ref_rejects_out_of_order_names() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.tmp");
    let mut w = TableWriter::create(&path, 0x7368_6131, false).unwrap();
    w.set_limits(1, 2).unwrap();
    w.add_ref(&RefRecord::value("refs/heads/main", 1, vec![1; 20])).unwrap();
    let err = w.add_ref(&RefRecord::value("refs/heads/aaa", 2, vec![2; 20])).unwrap_err();
    assert!(matches!(err, StackError::Api(_)));
}

#[test]
fn add_ref_rejects_index_outside_declared_limits() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.tmp");
    let mut w = TableWriter::create(&path, 0x7368_6131, false).unwrap();
    w.set_limits(5, 5).unwrap();
    let err = w.add_ref(&RefRecord::value("refs/heads/main", 9, vec![1; 20])).unwrap_err();
    assert!(matches!(err, StackError::Api(_)));
}

#[test]
fn writer_produces_table_with_correct_record_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.tmp");
    let mut w = TableWriter::create(&path, 0x7368_6131, false).unwrap();
    w.set_limits(1, 3).unwrap();
    w.add_ref(&RefRecord::value("refs/heads/a", 1, vec![1; 20])).unwrap();
    w.add_ref(&RefRecord::tombstone("refs/heads/b", 2)).unwrap();
    w.add_log(&LogRecord {
        refname: "refs/heads/a".to_string(),
        update_index: 3,
        update: Some(LogUpdate {
            time: 100,
            email: "a@example.com".to_string(),
            old_hash: None,
            new_hash: Some(vec![1; 20]),
            message: "created".to_string(),
        }),
    })
    .unwrap();

    let finished = w.finish().unwrap();
    assert_eq!(finished.record_count, 3);
    assert_eq!(finished.min_update_index, 1);
    assert_eq!(finished.max_update_index, 3);
    assert!(finished.path.is_some());
    assert!(finished.path.unwrap().exists());
}

#[test]
fn log_message_gets_trailing_newline_unless_exact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.tmp");
    let mut w = TableWriter::create(&path, 0x7368_6131, false).unwrap();
    w.set_limits(1, 1).unwrap();
    w.add_log(&LogRecord {
        refname: "refs/heads/a".to_string(),
        update_index: 1,
        update: Some(LogUpdate {
            time: 1,
            email: "a@example.com".to_string(),
            old_hash: None,
            new_hash: Some(vec![9; 20]),
            message: "no newline here".to_string(),
        }),
    })
    .unwrap();
    let finished = w.finish().unwrap();
    let table_path = finished.path.unwrap();

    let reader = TableReader::open(&table_path).unwrap();
    let log = reader.get_log_at("refs/heads/a", 1).unwrap().unwrap();
    assert_eq!(log.update.unwrap().message, "no newline here\n");
}

#[test]
fn log_message_with_embedded_newline_rejected_unless_exact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.tmp");
    let mut w = TableWriter::create(&path, 0x7368_6131, false).unwrap();
    w.set_limits(1, 1).unwrap();
    let err = w
        .add_log(&LogRecord {
            refname: "refs/heads/a".to_string(),
            update_index: 1,
            update: Some(LogUpdate {
                time: 1,
                email: "a@example.com".to_string(),
                old_hash: None,
                new_hash: None,
                message: "line one\nline two".to_string(),
            }),
        })
        .unwrap_err();
    assert!(matches!(err, StackError::Api(_)));
}
