//! Orphan table garbage collection (§4.7).
//!
//! Compaction leaves the replaced tables' files behind — other processes
//! may still have readers open on them — and lets `clean()` remove them
//! later, once nothing references them from the manifest.

use crate::{lock::LockGuard, manifest, Stack};
use reftable_config::StackError;
use std::collections::HashSet;

impl Stack {
    /// Removes table files in this stack's directory that are not
    /// referenced by the current manifest.
    ///
    /// Dotfiles (including the provisional `.tmp-*` files a concurrent
    /// writer may be mid-way through) and `.lock` files are left alone
    /// (§4.7).
    pub fn clean(&mut self) -> Result<(), StackError> {
        let lock = LockGuard::acquire(&manifest::manifest_path(&self.dir))?;
        self.load()?;

        let referenced: HashSet<&str> = self.filenames.iter().map(String::as_str).collect();

        let entries = std::fs::read_dir(&self.dir)?;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };

            if name == manifest::MANIFEST_FILENAME {
                continue;
            }
            if name.starts_with('.') || name.ends_with(".lock") {
                continue;
            }
            if referenced.contains(name) {
                continue;
            }

            let path = self.dir.join(name);
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("clean: failed to remove orphan table {}: {}", path.display(), e);
            } else {
                log::debug!("clean: removed orphan table {}", path.display());
            }
        }

        lock.abort();
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/cleanup_tests.rs"]
mod tests;
