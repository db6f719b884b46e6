use crate::*;

#[test]
fn default_options_are_all_zero() {
    let opts = StackOptions::default();
    assert_eq!(opts.hash_id, 0);
    assert_eq!(opts.default_permissions, 0);
    assert!(!opts.disable_auto_compact);
    assert!(!opts.exact_log_message);
}

#[test]
fn default_expiry_drops_nothing() {
    let expiry = ExpiryPolicy::default();
    assert!(!expiry.drops(0, 0));
    assert!(!expiry.drops(u64::MAX, 0));
    assert!(!expiry.drops(0, u64::MAX));
}

#[test]
fn expiry_with_only_a_time_bound_ignores_update_index() {
    let expiry = ExpiryPolicy { time: 10, min_update_index: 0 };
    assert!(expiry.drops(5, u64::MAX));
    assert!(!expiry.drops(20, 0));
}

#[test]
fn expiry_with_both_bounds_drops_on_either_one() {
    let expiry = ExpiryPolicy { time: 10, min_update_index: 15 };
    // time is below its bound, update_index is not: still dropped.
    assert!(expiry.drops(5, 20));
    // update_index is below its bound, time is not: still dropped.
    assert!(expiry.drops(20, 5));
    // neither below its bound: kept.
    assert!(!expiry.drops(20, 20));
}

#[test]
fn hash_len_known_formats() {
    assert_eq!(hash_len(HASH_FORMAT_SHA1), Some(20));
    assert_eq!(hash_len(HASH_FORMAT_SHA256), Some(32));
    assert_eq!(hash_len(0), None);
}
