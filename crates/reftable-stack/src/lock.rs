//! The exclusive-create lock file primitive (§4.2).
//!
//! Every mutable target — `tables.list`, and each table file during
//! compaction — is protected by a `<target>.lock` sibling. Acquisition is an
//! exclusive create; release is either a rename over `target` (commit) or an
//! unlink (abort). [`LockGuard`] wraps this as a scoped resource (§9 "Locks
//! as scoped resources"): if it is dropped without an explicit `commit`, it
//! aborts.

use reftable_config::StackError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Returns the lock path for `target`: `target` with `.lock` appended to its
/// filename.
pub fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// A held lock on `target`, backed by an exclusively-created `target.lock`.
pub struct LockGuard {
    lock_path: PathBuf,
    target_path: PathBuf,
    file: Option<File>,
    released: bool,
}

impl LockGuard {
    /// Acquires the lock on `target` by exclusively creating `target.lock`.
    ///
    /// Returns `StackError::Lock` if the lock file already exists — another
    /// writer holds it.
    pub fn acquire(target: &Path) -> Result<Self, StackError> {
        let lock_path = lock_path_for(target);
        match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
            Ok(file) => Ok(Self {
                lock_path,
                target_path: target.to_path_buf(),
                file: Some(file),
                released: false,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(StackError::Lock),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes `content` into the lock file, overwriting whatever was there.
    pub fn write_all(&mut self, content: &[u8]) -> Result<(), StackError> {
        let file = self
            .file
            .as_mut()
            .expect("write_all called on a released lock");
        file.write_all(content)?;
        Ok(())
    }

    /// Applies POSIX permission bits to the lock file. A no-op if `mode` is
    /// `None` or on non-Unix targets — the created file inherits that mode
    /// across the commit rename.
    #[cfg(unix)]
    pub fn set_permissions(&self, mode: Option<u32>) -> Result<(), StackError> {
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.lock_path, std::fs::Permissions::from_mode(mode))?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn set_permissions(&self, _mode: Option<u32>) -> Result<(), StackError> {
        Ok(())
    }

    /// Commits the lock: fsyncs its contents, then renames it over `target`,
    /// publishing it atomically (§4.2, §9 "Manifest-as-source-of-truth").
    pub fn commit(mut self) -> Result<(), StackError> {
        let file = self.file.take().expect("commit called on a released lock");
        file.sync_all()?;
        drop(file);
        std::fs::rename(&self.lock_path, &self.target_path)?;
        self.released = true;
        if let Some(parent) = self.target_path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }

    /// Aborts the lock: unlinks the lock file without publishing it.
    pub fn abort(mut self) {
        self.release_best_effort();
    }

    fn release_best_effort(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.file.take();
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("failed to remove lock file {}: {}", self.lock_path.display(), e);
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_best_effort();
    }
}

#[cfg(test)]
#[path = "tests/lock_tests.rs"]
mod tests;
