use crate::*;
use reftable_record::RefRecord;
use tempfile::tempdir;

fn write_table(dir: &std::path::Path, name: &str, refs: &[RefRecord], lo: u64, hi: u64) -> TableReader {
    let path = dir.join(name);
    let mut w = TableWriter::create(&path, 0x7368_6131, false).unwrap();
    w.set_limits(lo, hi).unwrap();
    for r in refs {
        w.add_ref(r).unwrap();
    }
    let finished = w.finish().unwrap();
    TableReader::open(finished.path.unwrap()).unwrap()
}

#[test]
fn merge_deduplicates_refname_by_preferring_newest_table() {
    let dir = tempdir().unwrap();
    let older = write_table(
        dir.path(),
        "older",
        &[RefRecord::value("refs/heads/a", 1, vec![1; 20])],
        1,
        1,
    );
    let newer = write_table(
        dir.path(),
        "newer",
        &[RefRecord::value("refs/heads/a", 2, vec![2; 20])],
        2,
        2,
    );

    let readers = vec![older, newer];
    let mut merge = MergeIterator::new(&readers);
    let merged = merge.collect_all_refs().unwrap();

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].update_index, 2);
}

#[test]
fn merge_yields_disjoint_refnames_in_sorted_order() {
    let dir = tempdir().unwrap();
    let t1 = write_table(dir.path(), "t1", &[RefRecord::value("refs/heads/z", 1, vec![1; 20])], 1, 1);
    let t2 = write_table(dir.path(), "t2", &[RefRecord::value("refs/heads/a", 2, vec![2; 20])], 2, 2);

    let readers = vec![t1, t2];
    let mut merge = MergeIterator::new(&readers);
    let merged = merge.collect_all_refs().unwrap();

    let names: Vec<&str> = merged.iter().map(|r| r.refname.as_str()).collect();
    assert_eq!(names, vec!["refs/heads/a", "refs/heads/z"]);
}

#[test]
fn merge_preserves_tombstones() {
    let dir = tempdir().unwrap();
    let t1 = write_table(dir.path(), "t1", &[RefRecord::value("refs/heads/a", 1, vec![1; 20])], 1, 1);
    let t2 = write_table(dir.path(), "t2", &[RefRecord::tombstone("refs/heads/a", 2)], 2, 2);

    let readers = vec![t1, t2];
    let mut merge = MergeIterator::new(&readers);
    let merged = merge.collect_all_refs().unwrap();

    assert_eq!(merged.len(), 1);
    assert!(merged[0].is_tombstone());
}
