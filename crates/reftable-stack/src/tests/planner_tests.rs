use super::*;

#[test]
fn planner_finds_the_documented_segment() {
    let sizes = [512, 64, 17, 16, 9, 9, 9, 16, 2, 16];
    assert_eq!(suggest_compaction_segment(&sizes, sizes.len(), 2), (1, 10));
}

#[test]
fn planner_declines_a_strictly_geometric_sequence() {
    let sizes = [64, 32, 16, 8, 4, 2];
    assert_eq!(suggest_compaction_segment(&sizes, sizes.len(), 2), (0, 0));
}

#[test]
fn planner_declines_on_a_single_table() {
    assert_eq!(suggest_compaction_segment(&[100], 1, 2), (0, 0));
}

#[test]
fn planner_declines_on_an_empty_stack() {
    assert_eq!(suggest_compaction_segment(&[], 0, 2), (0, 0));
}

#[test]
fn planner_compacts_two_equal_tables() {
    assert_eq!(suggest_compaction_segment(&[10, 10], 2, 2), (0, 2));
}
