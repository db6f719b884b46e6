//! Read path: `read_ref`, `read_log`, and the `add` facade sugar (§4.6).
//!
//! Point lookups walk tables newest-to-oldest and stop at the first table
//! that mentions the name at all — its record (live or tombstone) shadows
//! every older table's, so there is no need to consult them. This is the
//! same newest-first-wins discipline the teacher's `get()` uses across L0
//! before L1; here there is only one ordered sequence instead of two
//! levels.

use crate::Stack;
use reftable_config::StackError;
use reftable_record::{LogUpdate, RefTarget};
use reftable_table::TableWriter;

impl Stack {
    /// Looks up the current target of `refname`.
    ///
    /// Returns `Ok(None)` both when the name is absent and when the newest
    /// record for it is a tombstone (§4.6: "not found", outcome 1, covers
    /// both).
    pub fn read_ref(&self, refname: &str) -> Result<Option<RefTarget>, StackError> {
        for reader in self.readers.iter().rev() {
            if let Some(record) = reader.get_ref(refname)? {
                return Ok(record.target);
            }
        }
        Ok(None)
    }

    /// Looks up the most recent log entry for `refname`.
    ///
    /// Returns `Ok(None)` both when the name has no log history and when
    /// its newest entry is a tombstone.
    pub fn read_log(&self, refname: &str) -> Result<Option<LogUpdate>, StackError> {
        for reader in self.readers.iter().rev() {
            if let Some(record) = reader.get_log_newest(refname)? {
                return Ok(record.update);
            }
        }
        Ok(None)
    }

    /// Convenience wrapper around [`Stack::new_addition`] /
    /// [`crate::Addition::add`] / [`crate::Addition::commit`] for the common
    /// case of a single table addition.
    ///
    /// Does not retry on `StackError::Outdated` — it propagates immediately,
    /// same as `new_addition` itself (§4.3 step 3, §8 scenario 2:
    /// `S2.add` fails outright and only a subsequent `S2` succeeds after an
    /// *explicit* `Stack::load`). A caller's `write_cb` closure may have
    /// captured values, such as an `update_index` read before the call, that
    /// are only valid against the snapshot this call started with; silently
    /// reloading and re-invoking that same closure would replay it against a
    /// different snapshot without it knowing, so the retry is left to the
    /// caller, who is in a position to recompute those values first.
    pub fn add<F>(&mut self, mut write_cb: F) -> Result<(), StackError>
    where
        F: FnMut(&mut TableWriter) -> Result<(), StackError>,
    {
        let mut addition = self.new_addition()?;
        addition.add(&mut write_cb)?;
        addition.commit()
    }
}

#[cfg(test)]
#[path = "tests/read_tests.rs"]
mod tests;
