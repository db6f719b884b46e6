//! Append transaction (§4.3).
//!
//! `new_addition` locks the manifest and snapshots it; `add` lets the caller
//! fill a fresh table through a `TableWriter`; `commit` publishes the
//! extended manifest and releases the lock. Dropping an `Addition` without
//! committing unwinds any tables it wrote.

use crate::{lock::LockGuard, manifest, naming, Stack};
use reftable_config::StackError;
use reftable_table::TableWriter;
use std::path::PathBuf;

struct PendingTable {
    filename: String,
    path: PathBuf,
}

/// A single in-flight append transaction against a [`Stack`] (§4.3).
pub struct Addition<'a> {
    stack: &'a mut Stack,
    lock: Option<LockGuard>,
    manifest_snapshot: Vec<String>,
    pending: Vec<PendingTable>,
    next_update_index: u64,
    committed: bool,
}

impl Stack {
    /// Begins an append transaction: checks whether this stack's cached
    /// view is stale, locks `tables.list`, and re-reads it under the lock
    /// to check for a concurrent writer (§4.3 step 1-3).
    ///
    /// This does *not* reload on staleness — it only detects it. A caller
    /// whose snapshot has gone stale gets `StackError::Outdated` back and
    /// must call [`Stack::load`] before retrying (verified against
    /// `test_reftable_stack_uptodate`: the second stack's `add` fails
    /// outright rather than silently reloading and succeeding).
    pub fn new_addition(&mut self) -> Result<Addition<'_>, StackError> {
        let disk_stat = manifest::stat(&self.dir)?;
        if disk_stat != self.manifest_stat {
            return Err(StackError::Outdated);
        }

        let manifest_snapshot = self.filenames.clone();
        let next_update_index = self.next_update_index;

        let lock = LockGuard::acquire(&manifest::manifest_path(&self.dir))?;

        let (on_disk_names, _) = manifest::load(&self.dir)?;
        if on_disk_names != manifest_snapshot {
            lock.abort();
            return Err(StackError::Outdated);
        }

        Ok(Addition {
            stack: self,
            lock: Some(lock),
            manifest_snapshot,
            pending: Vec::new(),
            next_update_index,
            committed: false,
        })
    }
}

impl<'a> Addition<'a> {
    /// Runs `write_cb` against a fresh [`TableWriter`] whose declared lower
    /// bound is this transaction's next update index, then renames its
    /// output into its final `<lo>-<hi>-<suffix>` name (§4.3 step 4).
    ///
    /// If `write_cb` adds no records, this is a silent no-op (§9 "Supplying
    /// an empty write_cb").
    pub fn add<F>(&mut self, mut write_cb: F) -> Result<(), StackError>
    where
        F: FnMut(&mut TableWriter) -> Result<(), StackError>,
    {
        let lo = self.next_update_index;
        let tmp_path = naming::provisional_path(&self.stack.dir, lo);
        let hash_format_id = self.stack.effective_hash_format_id();

        let mut writer = TableWriter::create(&tmp_path, hash_format_id, self.stack.opts.exact_log_message)?;
        writer.set_limits(lo, lo)?;

        if let Err(e) = write_cb(&mut writer) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        let finished = match writer.finish() {
            Ok(f) => f,
            Err(e) => {
                let _ = std::fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        let Some(written_path) = finished.path else {
            return Ok(());
        };

        if finished.min_update_index < lo {
            let _ = std::fs::remove_file(&written_path);
            return Err(StackError::Api(format!(
                "write_cb produced update_index {} below the transaction's floor {}",
                finished.min_update_index, lo
            )));
        }

        let filename = naming::table_filename(finished.min_update_index, finished.max_update_index);
        let final_path = self.stack.dir.join(&filename);
        std::fs::rename(&written_path, &final_path)?;

        self.next_update_index = finished.max_update_index + 1;
        self.pending.push(PendingTable {
            filename,
            path: final_path,
        });
        Ok(())
    }

    /// Publishes the extended manifest and reloads the stack (§4.3 step
    /// 5-6). A transaction that added nothing commits as a no-op.
    pub fn commit(mut self) -> Result<(), StackError> {
        let lock = self.lock.take().expect("commit called twice");

        if self.pending.is_empty() {
            lock.abort();
            self.committed = true;
            return Ok(());
        }

        let mut names = self.manifest_snapshot.clone();
        names.extend(self.pending.iter().map(|p| p.filename.clone()));

        let mut lock = lock;
        lock.write_all(manifest::serialize(&names).as_bytes())?;
        lock.set_permissions(self.stack.opts.default_permissions_opt())?;

        if let Some(mode) = self.stack.opts.default_permissions_opt() {
            for pending in &self.pending {
                set_file_permissions(&pending.path, mode)?;
            }
        }

        lock.commit()?;
        self.committed = true;

        self.stack.load()?;

        if !self.stack.opts.disable_auto_compact {
            if let Err(e) = self.stack.auto_compact() {
                log::warn!("auto-compaction after commit failed: {}", e);
            }
        }

        Ok(())
    }
}

impl<'a> Drop for Addition<'a> {
    fn drop(&mut self) {
        if !self.committed {
            for pending in &self.pending {
                let _ = std::fs::remove_file(&pending.path);
            }
        }
    }
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
#[path = "tests/addition_tests.rs"]
mod tests;
