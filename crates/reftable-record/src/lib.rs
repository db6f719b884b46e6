//! # Record model
//!
//! The reference and log records a table holds, and the ordering the writer
//! enforces over them. The stack mostly treats these as payloads keyed by
//! `update_index` (§3), except where it must look inside them: tombstone
//! detection (`target`/`update == None`) and log expiry, which compares
//! `LogUpdate::time` and `update_index` against an `ExpiryPolicy` (§4.5).

mod key;
mod log;
mod reference;

pub use key::{LogKey, RefKey};
pub use log::{LogRecord, LogUpdate};
pub use reference::{RefRecord, RefTarget};

/// Either kind of record a table can hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A reference record (§3: "a named pointer to content-addressed bytes").
    Ref(RefRecord),
    /// A per-reference log entry.
    Log(LogRecord),
}

impl Record {
    /// The update index this record was written at.
    #[must_use]
    pub fn update_index(&self) -> u64 {
        match self {
            Record::Ref(r) => r.update_index,
            Record::Log(l) => l.update_index,
        }
    }

    /// `true` if this record is a deletion marker.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        match self {
            Record::Ref(r) => r.is_tombstone(),
            Record::Log(l) => l.is_tombstone(),
        }
    }
}
