use super::*;
use tempfile::tempdir;

#[test]
fn stat_is_none_for_an_absent_manifest() {
    let dir = tempdir().unwrap();
    assert_eq!(stat(dir.path()).unwrap(), None);
}

#[test]
fn parse_drops_trailing_blank_line_and_stray_cr() {
    let names = parse("a\r\nb\nc\n");
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn serialize_is_one_name_per_line_with_no_header() {
    let names = vec!["0000000000000001-0000000000000001-deadbeef".to_string()];
    let text = serialize(&names);
    assert_eq!(text, "0000000000000001-0000000000000001-deadbeef\n");
}

#[test]
fn load_round_trips_through_serialize() {
    let dir = tempdir().unwrap();
    let names = vec!["a".to_string(), "b".to_string()];
    std::fs::write(manifest_path(dir.path()), serialize(&names)).unwrap();

    let (loaded, stat) = load(dir.path()).unwrap();
    assert_eq!(loaded, names);
    assert!(stat.is_some());
}

#[test]
fn stat_changes_after_the_file_is_rewritten_with_different_content() {
    let dir = tempdir().unwrap();
    let path = manifest_path(dir.path());
    std::fs::write(&path, "a\n").unwrap();
    let first = stat(dir.path()).unwrap();

    std::fs::write(&path, "a\nb\nc\n").unwrap();
    let second = stat(dir.path()).unwrap();

    assert_ne!(first, second);
}
