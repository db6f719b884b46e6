use super::*;
use reftable_config::StackOptions;
use reftable_record::{LogRecord, LogUpdate, RefRecord};
use tempfile::tempdir;

fn open(dir: &std::path::Path) -> Stack {
    let mut opts = StackOptions::default();
    opts.disable_auto_compact = true;
    Stack::open(dir, opts).unwrap()
}

#[test]
fn compact_all_merges_several_ref_tables_into_one() {
    let dir = tempdir().unwrap();
    let mut stack = open(dir.path());

    for name in ["a", "b", "c"] {
        let idx = stack.next_update_index();
        stack.add(|w| w.add_ref(&RefRecord::symbolic(name, idx, "refs/heads/master"))).unwrap();
    }
    assert_eq!(stack.len(), 3);

    stack.compact_all(None).unwrap();
    assert_eq!(stack.len(), 1);

    for name in ["a", "b", "c"] {
        assert!(stack.read_ref(name).unwrap().is_some());
    }
}

#[test]
fn expiry_drops_old_log_entries_but_keeps_newer_ones() {
    let dir = tempdir().unwrap();
    let mut stack = open(dir.path());

    for i in 1..=19u64 {
        let idx = stack.next_update_index();
        assert_eq!(idx, i);
        stack
            .add(|w| {
                w.add_log(&LogRecord {
                    refname: format!("branch{:02}", i),
                    update_index: idx,
                    update: Some(LogUpdate {
                        time: i,
                        email: "a@example.com".to_string(),
                        old_hash: None,
                        new_hash: Some(vec![1u8; 20]),
                        message: "update".to_string(),
                    }),
                })
            })
            .unwrap();
    }
    assert_eq!(stack.len(), 19);

    stack.compact_all(Some(ExpiryPolicy { time: 10, min_update_index: 0 })).unwrap();
    assert_eq!(stack.len(), 1);

    assert!(stack.read_log("branch09").unwrap().is_none());
    assert!(stack.read_log("branch11").unwrap().is_some());

    stack
        .compact_all(Some(ExpiryPolicy { time: 10, min_update_index: 15 }))
        .unwrap();
    assert!(stack.read_log("branch14").unwrap().is_none());
    assert!(stack.read_log("branch16").unwrap().is_some());
}

#[test]
fn explicit_compact_range_fails_hard_on_a_locked_table() {
    let dir = tempdir().unwrap();
    let mut stack = open(dir.path());

    for name in ["a", "b"] {
        let idx = stack.next_update_index();
        stack.add(|w| w.add_ref(&RefRecord::symbolic(name, idx, "refs/heads/master"))).unwrap();
    }

    let table0 = dir.path().join(&stack.filenames[0]);
    let guard = LockGuard::acquire(&table0).unwrap();

    let err = stack.compact_range(0, 1, None, false).unwrap_err();
    assert!(matches!(err, StackError::Lock));
    assert_eq!(stack.len(), 2, "a failed explicit compaction must not change the stack");

    guard.abort();
}
