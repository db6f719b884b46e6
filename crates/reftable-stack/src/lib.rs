//! # reftable-stack — the stack manager
//!
//! Ties together [`reftable_table`]'s readers/writer/merge primitives and
//! [`reftable_config`]'s options into the transactional append/compaction/
//! cleanup protocol described by the directory layout in §6:
//!
//! ```text
//! <dir>/tables.list         ← manifest (text, LF-separated)
//! <dir>/tables.list.lock    ← transient, exclusive-create
//! <dir>/<lo>-<hi>-<sfx>     ← immutable table blob
//! <dir>/<lo>-<hi>-<sfx>.lock ← transient, held during compaction
//! ```
//!
//! ## Module responsibilities
//!
//! | Module        | Purpose                                              |
//! |---------------|-------------------------------------------------------|
//! | [`lib.rs`]    | `Stack` struct, `open`, `load`, accessors            |
//! | [`manifest`]  | `tables.list` parsing/serialization, stat identity    |
//! | [`lock`]      | exclusive-create/rename/unlink lock primitive         |
//! | [`naming`]    | table filename allocation                             |
//! | [`addition`]  | append transaction (`new_addition`, `add`, `commit`)  |
//! | [`compaction`]| planner + `compact_range`/`compact_all`/`auto_compact`|
//! | [`cleanup`]   | orphan table GC                                       |
//! | [`read`]      | `read_ref`, `read_log`, facade `add`                  |
//!
//! ## Durability
//!
//! There is no separate write-ahead log. Every table is fsynced before its
//! filename is published in the manifest, and the manifest itself is
//! published by the same lock-write-fsync-rename protocol (§4.2, §4.4, I4).
//! A crash before the rename leaves only an orphan `.lock` file, cleanable
//! by [`Stack::clean`]; a crash after leaves a consistent manifest
//! referencing only fully-written tables.

mod addition;
mod cleanup;
mod compaction;
mod lock;
mod manifest;
mod naming;
mod read;

pub use addition::Addition;
pub use compaction::suggest_compaction_segment;
pub use manifest::ManifestStat;

use reftable_config::{StackError, StackOptions, HASH_FORMAT_SHA1};
use reftable_table::TableReader;
use std::path::{Path, PathBuf};

/// Process-local, advisory counters (§9 "Stats counters"). Not persisted;
/// reset when the `Stack` is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    /// Number of `compact_range`/`compact_all`/`auto_compact` attempts.
    pub attempts: u64,
    /// Number of those attempts that failed or were narrowed due to lock
    /// contention.
    pub failures: u64,
    /// Total records written across all successful compactions.
    pub entries_written: u64,
}

/// The owning aggregate binding a directory of tables to an in-memory view
/// of its manifest (§3).
pub struct Stack {
    dir: PathBuf,
    opts: StackOptions,
    manifest_stat: Option<ManifestStat>,
    pub(crate) filenames: Vec<String>,
    pub(crate) readers: Vec<TableReader>,
    pub(crate) hash_format_id: u32,
    pub(crate) next_update_index: u64,
    pub(crate) stats: Stats,
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("dir", &self.dir)
            .field("table_count", &self.readers.len())
            .field("hash_format_id", &format!("{:#x}", self.hash_format_id))
            .field("next_update_index", &self.next_update_index)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Stack {
    /// Opens (creating if necessary) a stack rooted at `dir`, reading
    /// `tables.list` if present (§3 "Lifecycle").
    pub fn open<P: AsRef<Path>>(dir: P, opts: StackOptions) -> Result<Self, StackError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let mut stack = Self {
            dir,
            opts,
            manifest_stat: None,
            filenames: Vec::new(),
            readers: Vec::new(),
            hash_format_id: opts.hash_id,
            next_update_index: 1,
            stats: Stats::default(),
        };
        stack.load()?;
        Ok(stack)
    }

    /// The directory this stack is rooted at.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The options this stack was opened with.
    #[must_use]
    pub fn opts(&self) -> &StackOptions {
        &self.opts
    }

    /// A snapshot of the advisory compaction counters (§9).
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// One past the maximum `max_update_index` currently in the stack, or 1
    /// if empty (§3, P2).
    #[must_use]
    pub fn next_update_index(&self) -> u64 {
        self.next_update_index
    }

    /// The number of tables currently in the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// `true` if the stack currently has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// The hash format id this stack has adopted, or `0` if no table has
    /// been opened yet and no explicit `hash_id` was configured.
    #[must_use]
    pub fn hash_format_id(&self) -> u32 {
        self.hash_format_id
    }

    /// The hash format id a newly-written table should declare: the
    /// adopted id if one exists, else SHA-1 (§9 "Hash format id adoption is
    /// per-directory").
    pub(crate) fn effective_hash_format_id(&self) -> u32 {
        if self.hash_format_id != 0 {
            self.hash_format_id
        } else {
            HASH_FORMAT_SHA1
        }
    }

    /// Reloads `readers[]` from the on-disk manifest if it has advanced
    /// since the last load (§4.1). A no-op if the manifest's stat identity
    /// is unchanged.
    pub fn load(&mut self) -> Result<(), StackError> {
        let disk_stat = manifest::stat(&self.dir)?;
        if disk_stat == self.manifest_stat {
            return Ok(());
        }
        log::debug!("reloading manifest for {}", self.dir.display());

        let (names, stat) = manifest::load(&self.dir)?;
        let mut new_readers: Vec<TableReader> = Vec::with_capacity(names.len());
        let mut adopted_hash = self.opts.hash_id;

        for name in &names {
            let path = self.dir.join(name);
            let reader = TableReader::open(&path)?;

            if adopted_hash == 0 {
                adopted_hash = reader.hash_format_id();
            } else if reader.hash_format_id() != adopted_hash {
                return Err(StackError::Format {
                    expected: adopted_hash,
                    found: reader.hash_format_id(),
                });
            }

            if let Some(last) = new_readers.last() {
                let (_, prev_max) = last.update_index_range();
                let (lo, _) = reader.update_index_range();
                if lo <= prev_max {
                    return Err(StackError::Api(format!(
                        "table ranges are not strictly ascending: {} follows {}",
                        lo, prev_max
                    )));
                }
            }

            new_readers.push(reader);
        }

        let next_update_index = new_readers
            .last()
            .map(|r| r.update_index_range().1 + 1)
            .unwrap_or(1);

        log::debug!(
            "stack {} now has {} tables, next_update_index={}",
            self.dir.display(),
            new_readers.len(),
            next_update_index
        );

        self.readers = new_readers;
        self.filenames = names;
        self.manifest_stat = stat;
        self.next_update_index = next_update_index;
        if adopted_hash != 0 {
            self.hash_format_id = adopted_hash;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
