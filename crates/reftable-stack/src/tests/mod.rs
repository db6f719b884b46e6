//! Stack-level integration tests covering the lifecycle scenarios a single
//! module's unit tests can't exercise end to end.

use crate::Stack;
use reftable_config::{StackError, StackOptions};
use reftable_record::{RefRecord, RefTarget};
use tempfile::tempdir;

fn add_symbolic(stack: &mut Stack, name: &str, target: &str) {
    let idx = stack.next_update_index();
    stack
        .add(|w| w.add_ref(&RefRecord::symbolic(name, idx, target)))
        .unwrap();
}

#[test]
fn single_add_and_read_round_trips() {
    let dir = tempdir().unwrap();
    let mut stack = Stack::open(dir.path(), StackOptions::default()).unwrap();

    add_symbolic(&mut stack, "HEAD", "refs/heads/master");

    assert_eq!(
        stack.read_ref("HEAD").unwrap(),
        Some(RefTarget::Symbolic("refs/heads/master".to_string()))
    );

    let manifest_contents = std::fs::read_to_string(dir.path().join("tables.list")).unwrap();
    assert_eq!(manifest_contents.lines().count(), 1);
}

#[test]
fn concurrent_writers_detect_outdated_manifest_and_recover_on_reload() {
    let dir = tempdir().unwrap();
    let mut s1 = Stack::open(dir.path(), StackOptions::default()).unwrap();
    let mut s2 = Stack::open(dir.path(), StackOptions::default()).unwrap();

    add_symbolic(&mut s1, "refs/heads/a", "refs/heads/master");

    let idx = s2.next_update_index();
    let err = s2
        .add(|w| w.add_ref(&RefRecord::symbolic("refs/heads/b", idx, "refs/heads/master")))
        .unwrap_err();
    assert!(matches!(err, StackError::Outdated));

    s2.load().unwrap();
    add_symbolic(&mut s2, "refs/heads/b", "refs/heads/master");

    let manifest_contents = std::fs::read_to_string(dir.path().join("tables.list")).unwrap();
    assert_eq!(manifest_contents.lines().count(), 2);
}

#[test]
fn auto_compaction_collapses_a_disabled_burst_once_re_enabled() {
    let dir = tempdir().unwrap();
    let mut opts = StackOptions::default();
    opts.disable_auto_compact = true;
    let mut stack = Stack::open(dir.path(), opts).unwrap();

    for i in 0..20 {
        add_symbolic(&mut stack, &format!("branch{:04}", i), "refs/heads/master");
    }
    assert_eq!(stack.len(), 20);

    stack.opts.disable_auto_compact = false;
    add_symbolic(&mut stack, "branch0020", "refs/heads/master");
    assert_eq!(stack.len(), 1);
}

#[test]
fn commit_succeeds_despite_lock_contention_on_an_older_table() {
    let dir = tempdir().unwrap();
    let mut stack = Stack::open(dir.path(), StackOptions::default()).unwrap();

    add_symbolic(&mut stack, "refs/heads/a", "refs/heads/master");

    let table0 = dir.path().join(&stack.filenames[0]);
    let lock_path = crate::lock::lock_path_for(&table0);
    std::fs::write(&lock_path, b"").unwrap();

    add_symbolic(&mut stack, "refs/heads/b", "refs/heads/master");

    assert_eq!(stack.len(), 2);
    assert_eq!(stack.stats().attempts, 1);
    assert_eq!(stack.stats().failures, 1);

    std::fs::remove_file(&lock_path).unwrap();
}

#[test]
fn clean_removes_orphans_left_by_a_compaction_nobody_saw_finish() {
    let dir = tempdir().unwrap();
    {
        let mut s1 = Stack::open(dir.path(), StackOptions::default()).unwrap();
        let _s2 = Stack::open(dir.path(), StackOptions::default()).unwrap();

        for i in 0..3 {
            add_symbolic(&mut s1, &format!("branch{}", i), "refs/heads/master");
        }
        s1.compact_all(None).unwrap();
        // s1/_s2 dropped here without any explicit close step, simulating a
        // process exit that never unlinked the now-orphaned originals.
    }

    let entries_before: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(entries_before.len() > 2, "expected orphan tables to still be present");

    let mut s3 = Stack::open(dir.path(), StackOptions::default()).unwrap();
    s3.clean().unwrap();

    let entries_after: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries_after.len(), 2, "tables.list + the one merged table");
}
