/// Per-reference log records: an append-only history of updates to a single
/// reference name, keyed by `(refname, update_index)`.

/// The payload of a live log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogUpdate {
    /// Wall-clock time the update was recorded, in whatever unit the caller
    /// uses consistently (seconds since epoch in the original reftable
    /// format; this crate treats it as an opaque comparable quantity used
    /// only by expiry, §4.5, §6).
    pub time: u64,
    /// Identity of whoever made the update (e.g. `"name <email>"`).
    pub email: String,
    /// The reference's value before this update, if known.
    pub old_hash: Option<Vec<u8>>,
    /// The reference's value after this update.
    pub new_hash: Option<Vec<u8>>,
    /// Free-text message describing the update.
    ///
    /// Normalization of this field (rejecting embedded newlines unless
    /// `exact_log_message` is set, appending a trailing newline otherwise)
    /// is the writer's responsibility, not this type's — see
    /// `reftable_table::TableWriter::add_log`.
    pub message: String,
}

/// A single log record as it appears inside a table.
///
/// `update == None` marks the record a tombstone, used to shadow an older
/// log entry for the same `(refname, update_index)` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// The reference name this log entry is about.
    pub refname: String,
    /// The update index this entry was recorded at. Log entries for the
    /// same `refname` at different update indices are distinct records;
    /// the newest (highest `update_index`) is the reference's current
    /// history head.
    pub update_index: u64,
    /// `Some(update)` for a live entry, `None` for a tombstone.
    pub update: Option<LogUpdate>,
}

impl LogRecord {
    /// Constructs a tombstone (deletion marker) for `(refname, update_index)`.
    #[must_use]
    pub fn tombstone(refname: impl Into<String>, update_index: u64) -> Self {
        Self {
            refname: refname.into(),
            update_index,
            update: None,
        }
    }

    /// `true` if this record is a deletion marker.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.update.is_none()
    }
}
