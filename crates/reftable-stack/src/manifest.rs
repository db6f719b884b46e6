//! Manifest (`tables.list`) I/O.
//!
//! The manifest is the sole source of truth for stack membership (§3, I1): a
//! newline-delimited, eldest-first list of table filenames. Unlike the
//! teacher's `MANIFEST`, this file carries no level markers or comments —
//! the stack manager does not sort tables into levels, it keeps one ordered
//! sequence.

use reftable_config::StackError;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Name of the manifest file within the stack directory.
pub const MANIFEST_FILENAME: &str = "tables.list";

/// Returns `<dir>/tables.list`.
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILENAME)
}

/// Identity snapshot of `tables.list` used to cheaply detect whether another
/// process has advanced the manifest since we last loaded it (§3, §4.1).
///
/// The stat check is an optimization, not a correctness mechanism — callers
/// that are about to mutate the manifest must still lock and re-read it
/// (§9 "Lock-then-recheck is mandatory even if the snapshot looks current").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestStat {
    size: u64,
    mtime: Option<SystemTime>,
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
}

/// Returns the current identity of `tables.list`, or `None` if it does not
/// exist (an empty stack).
pub fn stat(dir: &Path) -> Result<Option<ManifestStat>, StackError> {
    let path = manifest_path(dir);
    match std::fs::metadata(&path) {
        Ok(meta) => Ok(Some(stat_from_metadata(&meta))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn stat_from_metadata(meta: &std::fs::Metadata) -> ManifestStat {
    use std::os::unix::fs::MetadataExt;
    ManifestStat {
        size: meta.len(),
        mtime: meta.modified().ok(),
        dev: meta.dev(),
        ino: meta.ino(),
    }
}

#[cfg(not(unix))]
fn stat_from_metadata(meta: &std::fs::Metadata) -> ManifestStat {
    ManifestStat {
        size: meta.len(),
        mtime: meta.modified().ok(),
    }
}

/// Parses manifest contents into an ordered list of table filenames,
/// tolerating a trailing empty line and stray `\r` (§6).
pub fn parse(contents: &str) -> Vec<String> {
    contents
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serializes an ordered list of table filenames into manifest contents:
/// one filename per line, LF-terminated, no header (§6).
pub fn serialize(filenames: &[String]) -> String {
    let mut out = String::new();
    for name in filenames {
        out.push_str(name);
        out.push('\n');
    }
    out
}

/// Reads `tables.list`, returning its filenames (eldest-first) and identity
/// snapshot. An absent manifest is an empty stack, not an error.
pub fn load(dir: &Path) -> Result<(Vec<String>, Option<ManifestStat>), StackError> {
    let path = manifest_path(dir);
    let meta = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), None)),
        Err(e) => return Err(e.into()),
    };
    let contents = std::fs::read_to_string(&path)?;
    Ok((parse(&contents), Some(stat_from_metadata(&meta))))
}

#[cfg(test)]
#[path = "tests/manifest_tests.rs"]
mod tests;
