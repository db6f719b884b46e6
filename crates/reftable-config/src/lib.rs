//! # Configuration
//!
//! Options that govern how a stack behaves, and the stable error codes its
//! public API returns. Split out into its own crate so that both
//! `reftable-table` (which needs to construct `FormatError`) and
//! `reftable-stack` (which needs the rest) can depend on it without a cycle.

use std::io;
use thiserror::Error;

/// Options controlling the behavior of a stack.
///
/// Mirrors `reftable_write_options` from the original implementation: a
/// small, `Copy`-able bag of knobs rather than a builder, since every field
/// has an unambiguous zero value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackOptions {
    /// Expected hash format id. `0` means "adopt whatever the directory's
    /// existing manifest uses" (or `HASH_FORMAT_SHA1` for a fresh directory);
    /// any other value must match every table opened for this stack, or
    /// `StackError::Format` is returned.
    pub hash_id: u32,
    /// POSIX permission bits applied to every file this stack creates
    /// (tables and the manifest). `0` means "leave it to the process umask".
    pub default_permissions: u32,
    /// When `true`, `Addition::commit` skips the post-commit auto-compaction
    /// step (§4.3, §4.5). Off by default.
    pub disable_auto_compact: bool,
    /// When `true`, log messages are written verbatim. When `false`
    /// (default), a log message containing an embedded newline is rejected
    /// with `StackError::Api`, and a message missing a trailing newline has
    /// one appended.
    pub exact_log_message: bool,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            hash_id: 0,
            default_permissions: 0,
            disable_auto_compact: false,
            exact_log_message: false,
        }
    }
}

impl StackOptions {
    /// `default_permissions` as an `Option`: `None` means "leave it to the
    /// process umask", matching `std::fs::set_permissions`'s all-or-nothing
    /// API more naturally than the raw `0`-sentinel field.
    #[must_use]
    pub fn default_permissions_opt(&self) -> Option<u32> {
        if self.default_permissions == 0 {
            None
        } else {
            Some(self.default_permissions)
        }
    }
}

/// Hash format identifiers a table can advertise (§3).
pub const HASH_FORMAT_SHA1: u32 = 0x73_68_61_31; // "sha1"
/// Hash format identifiers a table can advertise (§3).
pub const HASH_FORMAT_SHA256: u32 = 0x73_32_35_36; // "s256"

/// Returns the digest length in bytes for a known hash format id, or `None`
/// if the id is not recognized.
pub fn hash_len(hash_id: u32) -> Option<usize> {
    match hash_id {
        HASH_FORMAT_SHA1 => Some(20),
        HASH_FORMAT_SHA256 => Some(32),
        _ => None,
    }
}

/// Expiry policy passed to compaction (§4.5, §6).
///
/// Each bound is independently optional: `0` means "this bound is not set",
/// not "below zero". A log record is dropped if *either* set bound it
/// violates: `time != 0 && record.time < time`, or `min_update_index != 0 &&
/// record.update_index < min_update_index`. Both default to `0`, i.e. "drop
/// nothing" (verified against `test_reflog_expire`'s two-stage expiry,
/// where adding a `min_update_index` bound to an already-`time`-bounded
/// policy drops strictly more records, not fewer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpiryPolicy {
    /// Log records with a timestamp below this are dropped, unless `0`
    /// (unset).
    pub time: u64,
    /// Log records with an update index below this are dropped, unless `0`
    /// (unset).
    pub min_update_index: u64,
}

impl ExpiryPolicy {
    /// Returns `true` if a log record with the given `time` and
    /// `update_index` should be dropped during compaction.
    #[must_use]
    pub fn drops(&self, time: u64, update_index: u64) -> bool {
        (self.time != 0 && time < self.time) || (self.min_update_index != 0 && update_index < self.min_update_index)
    }
}

/// Stable, externally-matchable error codes for the public API (§6, §7).
///
/// Unlike the internal `anyhow`-based plumbing used for file system
/// bookkeeping, every variant here is something a caller is expected to
/// branch on: `Outdated`/`Lock` are recoverable by reload-and-retry, `Api`
/// and `EmptyTable` mean the caller violated an invariant, `Format` means
/// the directory holds tables the stack cannot use.
#[derive(Debug, Error)]
pub enum StackError {
    /// The on-disk manifest changed since the last reload; the caller must
    /// reload and retry (§4.3 step 3, §4.5 step 2).
    #[error("manifest changed since last reload")]
    Outdated,
    /// A lock file the operation needed already exists (§4.2).
    #[error("lock held by another writer")]
    Lock,
    /// The caller violated an API-level invariant: unordered keys,
    /// overlapping update-index ranges, or an unnormalized log message
    /// (§4.3, §6).
    #[error("api misuse: {0}")]
    Api(String),
    /// A reader's `hash_format_id` did not match the stack's (§4.1, §6).
    #[error("hash format mismatch: stack uses {expected:#x}, table uses {found:#x}")]
    Format {
        /// The format id the stack had already adopted.
        expected: u32,
        /// The format id found on the offending table.
        found: u32,
    },
    /// A writer callback produced zero records where the caller expected at
    /// least one (§6). `Addition::add` itself treats this as a silent no-op
    /// rather than an error (§4.3 step 4); this variant exists for callers
    /// that want to detect and report it explicitly.
    #[error("writer callback produced no records")]
    EmptyTable,
    /// An underlying I/O error, propagated as-is (§7).
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests;
