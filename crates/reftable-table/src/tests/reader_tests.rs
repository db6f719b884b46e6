use crate::*;
use reftable_record::RefRecord;
use tempfile::tempdir;

fn write_sample(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("t.tmp");
    let mut w = TableWriter::create(&path, 0x7368_6131, false).unwrap();
    w.set_limits(1, 4).unwrap();
    w.add_ref(&RefRecord::value("refs/heads/a", 1, vec![0xaa; 20])).unwrap();
    w.add_ref(&RefRecord::symbolic("HEAD", 2, "refs/heads/a")).unwrap();
    w.add_ref(&RefRecord::tombstone("refs/heads/z", 3)).unwrap();
    let finished = w.finish().unwrap();
    finished.path.unwrap()
}

#[test]
fn get_ref_returns_value_and_symbolic_records() {
    let dir = tempdir().unwrap();
    let path = write_sample(dir.path());
    let reader = TableReader::open(&path).unwrap();

    let a = reader.get_ref("refs/heads/a").unwrap().unwrap();
    assert_eq!(a.target, Some(reftable_record::RefTarget::Value(vec![0xaa; 20])));

    let head = reader.get_ref("HEAD").unwrap().unwrap();
    assert_eq!(
        head.target,
        Some(reftable_record::RefTarget::Symbolic("refs/heads/a".to_string()))
    );
}

#[test]
fn get_ref_returns_tombstone_as_a_record_not_none() {
    let dir = tempdir().unwrap();
    let path = write_sample(dir.path());
    let reader = TableReader::open(&path).unwrap();

    let z = reader.get_ref("refs/heads/z").unwrap().unwrap();
    assert!(z.is_tombstone());
}

#[test]
fn get_ref_for_absent_name_returns_none() {
    let dir = tempdir().unwrap();
    let path = write_sample(dir.path());
    let reader = TableReader::open(&path).unwrap();

    assert!(reader.get_ref("refs/heads/nonexistent").unwrap().is_none());
}

#[test]
fn footer_range_matches_declared_limits() {
    let dir = tempdir().unwrap();
    let path = write_sample(dir.path());
    let reader = TableReader::open(&path).unwrap();
    assert_eq!(reader.update_index_range(), (1, 4));
}

#[test]
fn open_rejects_truncated_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.table");
    std::fs::write(&path, b"not a table").unwrap();
    assert!(TableReader::open(&path).is_err());
}
