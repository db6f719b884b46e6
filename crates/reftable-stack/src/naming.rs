//! Table filename allocation (§3: `<lo>-<hi>-<suffix>`, never reused).

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SUFFIX_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A value unique within this process, mixed from a monotonic counter, the
/// wall clock, and the pid — used to disambiguate otherwise-equal table
/// names and temp-file names.
pub fn unique_suffix() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0) as u64;
    let counter = SUFFIX_COUNTER.fetch_add(1, Ordering::Relaxed);
    nanos
        ^ counter.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (std::process::id() as u64)
}

/// The final, once-assigned name for a table covering `[min, max]`.
pub fn table_filename(min_update_index: u64, max_update_index: u64) -> String {
    format!(
        "{:016x}-{:016x}-{:08x}",
        min_update_index,
        max_update_index,
        unique_suffix() as u32
    )
}

/// A provisional temp-file path to write a table's contents into before its
/// final name (which depends on the writer's declared limits) is known.
pub fn provisional_path(dir: &std::path::Path, lo: u64) -> PathBuf {
    dir.join(format!(".tmp-{:016x}-{:016x}", lo, unique_suffix()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_suffix_does_not_repeat_within_a_tight_loop() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            assert!(seen.insert(unique_suffix()));
        }
    }

    #[test]
    fn table_filename_is_sortable_by_update_index() {
        let a = table_filename(1, 5);
        let b = table_filename(6, 9);
        assert!(a.as_str() < b.as_str());
    }

    #[test]
    fn provisional_path_lives_as_a_dotfile_in_the_target_dir() {
        let dir = std::path::Path::new("/tmp/example-stack");
        let p = provisional_path(dir, 3);
        assert_eq!(p.parent(), Some(dir));
        assert!(p.file_name().unwrap().to_str().unwrap().starts_with(".tmp-"));
    }
}
