//! Compaction planner and executor (§4.4, §4.5).
//!
//! Unlike the teacher's `compact`, which always flattens everything into a
//! single L1 SSTable, this compacts an arbitrary contiguous sub-range of the
//! stack — the range the planner proposes, or one the caller names
//! explicitly — and folds the result back into `tables.list` in place.

use crate::{lock::LockGuard, manifest, naming, Stack};
use reftable_config::{ExpiryPolicy, StackError};
use reftable_table::{MergeIterator, TableWriter};
use std::path::PathBuf;

/// Proposes a contiguous `[start, end)` range of tables to compact, given
/// their sizes in stack order (eldest-first, matching `sizes[0]` =
/// oldest).
///
/// Scans from the youngest end, extending a candidate suffix while each
/// newcomer is smaller than `factor` times the sum already accumulated;
/// otherwise the suffix is sealed and a new one starts. Among all sealed
/// suffixes of length ≥ 2, returns the one with the smallest total size,
/// breaking ties by preferring the younger (larger `end`) one. Declines
/// (`(0, 0)`) if no suffix reaches length 2.
#[must_use]
pub fn suggest_compaction_segment(sizes: &[u64], n: usize, factor: u64) -> (usize, usize) {
    let sizes = &sizes[..n];
    if n == 0 {
        return (0, 0);
    }

    struct Segment {
        start: usize,
        end: usize,
        sum: u64,
    }

    let mut sealed: Vec<Segment> = Vec::new();
    let mut cur: Option<Segment> = None;

    let mut i = n;
    while i > 0 {
        i -= 1;
        cur = Some(match cur {
            None => Segment { start: i, end: i + 1, sum: sizes[i] },
            Some(seg) if sizes[i] < factor * seg.sum => {
                Segment { start: i, end: seg.end, sum: seg.sum + sizes[i] }
            }
            Some(seg) => {
                sealed.push(seg);
                Segment { start: i, end: i + 1, sum: sizes[i] }
            }
        });
    }
    if let Some(seg) = cur {
        sealed.push(seg);
    }

    let mut best: Option<&Segment> = None;
    for seg in &sealed {
        if seg.end - seg.start < 2 {
            continue;
        }
        best = match best {
            None => Some(seg),
            Some(b) if seg.sum < b.sum || (seg.sum == b.sum && seg.end > b.end) => Some(seg),
            some_best => some_best,
        };
    }

    match best {
        Some(s) => (s.start, s.end),
        None => (0, 0),
    }
}

impl Stack {
    /// Compacts the inclusive table index range `[first, last]` into one
    /// replacement table (§4.5).
    ///
    /// `auto`: when `true`, a lock acquisition failure narrows the range to
    /// the longest already-locked prefix starting at `first` rather than
    /// failing outright (used by [`Stack::auto_compact`]). When `false`
    /// (explicit `compact_all`/`compact_range` callers), any lock failure
    /// aborts the whole operation.
    pub fn compact_range(
        &mut self,
        first: usize,
        last: usize,
        expiry: Option<ExpiryPolicy>,
        auto: bool,
    ) -> Result<(), StackError> {
        self.load()?;

        if self.readers.is_empty() || first > last || last >= self.readers.len() {
            return Ok(());
        }

        self.stats.attempts += 1;

        let manifest_lock = match LockGuard::acquire(&manifest::manifest_path(&self.dir)) {
            Ok(l) => l,
            Err(e) => {
                self.stats.failures += 1;
                return Err(e);
            }
        };

        let (on_disk_names, _) = manifest::load(&self.dir)?;
        if on_disk_names != self.filenames {
            manifest_lock.abort();
            return Err(StackError::Outdated);
        }

        let mut table_locks = Vec::new();
        let mut effective_last = last;
        let mut narrowed = false;

        for idx in first..=last {
            let path = self.dir.join(&self.filenames[idx]);
            match LockGuard::acquire(&path) {
                Ok(l) => table_locks.push(l),
                Err(StackError::Lock) => {
                    if auto {
                        narrowed = true;
                        // everything in [first, idx) is locked by us; idx itself is not
                        effective_last = if idx == first { first } else { idx - 1 };
                        break;
                    } else {
                        for l in table_locks {
                            l.abort();
                        }
                        manifest_lock.abort();
                        self.stats.failures += 1;
                        return Err(StackError::Lock);
                    }
                }
                Err(e) => {
                    for l in table_locks {
                        l.abort();
                    }
                    manifest_lock.abort();
                    return Err(e);
                }
            }
        }

        if narrowed && effective_last.saturating_sub(first) + 1 < 2 {
            for l in table_locks {
                l.abort();
            }
            manifest_lock.abort();
            self.stats.failures += 1;
            return Ok(());
        }
        if narrowed {
            self.stats.failures += 1;
        }

        let range = first..=effective_last;
        let drop_tombstones = first == 0;

        let tmp_path = naming::provisional_path(&self.dir, self.readers[first].update_index_range().0);
        let hash_format_id = self.effective_hash_format_id();
        let mut writer = TableWriter::create(&tmp_path, hash_format_id, self.opts.exact_log_message)?;

        let range_readers = &self.readers[range.clone()];
        let lo = range_readers.first().unwrap().update_index_range().0;
        let hi = range_readers.last().unwrap().update_index_range().1;
        writer.set_limits(lo, hi)?;

        let write_result = stream_merge_into(range_readers, &mut writer, expiry, drop_tombstones);
        let finished = match write_result.and_then(|()| writer.finish()) {
            Ok(f) => f,
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                for l in table_locks {
                    l.abort();
                }
                manifest_lock.abort();
                return Err(e);
            }
        };

        let mut new_names: Vec<String> = self.filenames[..first].to_vec();
        let mut replacement_path: Option<PathBuf> = None;
        if let Some(written_path) = finished.path {
            let filename = naming::table_filename(finished.min_update_index, finished.max_update_index);
            let final_path = self.dir.join(&filename);
            std::fs::rename(&written_path, &final_path)?;
            new_names.push(filename);
            replacement_path = Some(final_path);
        }
        new_names.extend(self.filenames[effective_last + 1..].iter().cloned());

        let mut manifest_lock = manifest_lock;
        manifest_lock.write_all(manifest::serialize(&new_names).as_bytes())?;
        manifest_lock.set_permissions(self.opts.default_permissions_opt())?;
        if let (Some(mode), Some(path)) = (self.opts.default_permissions_opt(), &replacement_path) {
            set_file_permissions(path, mode)?;
        }
        manifest_lock.commit()?;

        self.stats.entries_written += finished.record_count as u64;

        for l in table_locks {
            l.abort();
        }

        self.load()?;
        Ok(())
    }

    /// Compacts the entire stack into a single table (§4.5). Fails hard on
    /// lock contention rather than narrowing the range.
    ///
    /// Unlike the planner-driven [`Stack::auto_compact`], this runs even
    /// over a single table: re-applying an [`ExpiryPolicy`] to an
    /// already-compacted stack is a legitimate use (§8 scenario 6).
    pub fn compact_all(&mut self, expiry: Option<ExpiryPolicy>) -> Result<(), StackError> {
        if self.readers.is_empty() {
            return Ok(());
        }
        self.compact_range(0, self.readers.len() - 1, expiry, false)
    }

    /// Consults [`suggest_compaction_segment`] and, if it proposes a
    /// non-empty range, compacts it, narrowing around lock contention
    /// rather than failing (§4.3 step 6, §4.5).
    pub fn auto_compact(&mut self) -> Result<(), StackError> {
        if self.readers.len() < 2 {
            return Ok(());
        }
        let sizes: Vec<u64> = self
            .filenames
            .iter()
            .map(|name| {
                std::fs::metadata(self.dir.join(name))
                    .map(|m| m.len())
                    .unwrap_or(0)
            })
            .collect();
        let (start, end) = suggest_compaction_segment(&sizes, sizes.len(), 2);
        if end <= start {
            return Ok(());
        }
        self.compact_range(start, end - 1, None, true)
    }
}

fn stream_merge_into(
    readers: &[reftable_table::TableReader],
    writer: &mut TableWriter,
    expiry: Option<ExpiryPolicy>,
    drop_tombstones: bool,
) -> Result<(), StackError> {
    let mut merge = MergeIterator::new(readers);

    while let Some(rec) = merge.next_ref()? {
        if drop_tombstones && rec.is_tombstone() {
            continue;
        }
        writer.add_ref(&rec)?;
    }

    while let Some(rec) = merge.next_log()? {
        if drop_tombstones && rec.is_tombstone() {
            continue;
        }
        if let (Some(policy), Some(update)) = (expiry, &rec.update) {
            if policy.drops(update.time, rec.update_index) {
                continue;
            }
        }
        writer.add_log(&rec)?;
    }

    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &std::path::Path, mode: u32) -> Result<(), StackError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &std::path::Path, _mode: u32) -> Result<(), StackError> {
    Ok(())
}

#[cfg(test)]
#[path = "tests/compaction_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/planner_tests.rs"]
mod planner_tests;
