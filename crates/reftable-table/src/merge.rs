//! Merge iterator over multiple [`TableReader`]s.
//!
//! Tables are given oldest-first, matching their order in the manifest.
//! When the same refname appears in more than one table, the ref record
//! from the **newest** (highest-index) table wins. Log records are keyed by
//! `(refname, update_index)`, which a correctly-operating writer never
//! repeats across tables, so the log merge is a plain sorted union.

use reftable_config::StackError;
use reftable_record::{LogRecord, RefRecord};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::TableReader;

struct RefHeapEntry {
    refname: String,
    source: usize,
}

impl PartialEq for RefHeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.refname == other.refname && self.source == other.source
    }
}
impl Eq for RefHeapEntry {}

impl PartialOrd for RefHeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RefHeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on refname; ties broken by preferring to pop the lower
        // source first so callers processing a tie see both in a stable order.
        other
            .refname
            .cmp(&self.refname)
            .then_with(|| other.source.cmp(&self.source))
    }
}

struct LogHeapEntry {
    key: (String, u64),
    source: usize,
}

impl PartialEq for LogHeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.source == other.source
    }
}
impl Eq for LogHeapEntry {}

impl PartialOrd for LogHeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogHeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.source.cmp(&self.source))
    }
}

/// Merges multiple tables (oldest-first) into sorted streams of
/// [`RefRecord`]s and [`LogRecord`]s.
pub struct MergeIterator<'a> {
    readers: &'a [TableReader],
    ref_iters: Vec<std::vec::IntoIter<String>>,
    ref_heap: BinaryHeap<RefHeapEntry>,
    log_iters: Vec<std::vec::IntoIter<(String, u64)>>,
    log_heap: BinaryHeap<LogHeapEntry>,
}

impl<'a> MergeIterator<'a> {
    /// Builds a merge view over `readers`, given oldest-first.
    pub fn new(readers: &'a [TableReader]) -> Self {
        let mut ref_iters = Vec::with_capacity(readers.len());
        let mut ref_heap = BinaryHeap::new();
        let mut log_iters = Vec::with_capacity(readers.len());
        let mut log_heap = BinaryHeap::new();

        for (i, reader) in readers.iter().enumerate() {
            let names: Vec<String> = reader.ref_names().map(|s| s.to_string()).collect();
            let mut it = names.into_iter();
            if let Some(first) = it.next() {
                ref_heap.push(RefHeapEntry { refname: first, source: i });
            }
            ref_iters.push(it);

            let keys: Vec<(String, u64)> = reader.log_keys().cloned().collect();
            let mut it = keys.into_iter();
            if let Some(first) = it.next() {
                log_heap.push(LogHeapEntry { key: first, source: i });
            }
            log_iters.push(it);
        }

        Self {
            readers,
            ref_iters,
            ref_heap,
            log_iters,
            log_heap,
        }
    }

    /// Returns the next merged ref record in ascending refname order, or
    /// `None` when exhausted. On a name collision across tables, the
    /// highest-index (newest) table's record is kept.
    pub fn next_ref(&mut self) -> Result<Option<RefRecord>, StackError> {
        let top = match self.ref_heap.pop() {
            Some(e) => e,
            None => return Ok(None),
        };

        let mut best_source = top.source;
        let mut best = self.readers[top.source]
            .get_ref(&top.refname)?
            .ok_or_else(|| StackError::Api("merge: ref index entry vanished".to_string()))?;

        if let Some(next_name) = self.ref_iters[top.source].next() {
            self.ref_heap.push(RefHeapEntry {
                refname: next_name,
                source: top.source,
            });
        }

        while let Some(peek) = self.ref_heap.peek() {
            if peek.refname != top.refname {
                break;
            }
            let dup = self.ref_heap.pop().unwrap();
            if dup.source > best_source {
                best = self.readers[dup.source]
                    .get_ref(&dup.refname)?
                    .ok_or_else(|| StackError::Api("merge: ref index entry vanished".to_string()))?;
                best_source = dup.source;
            }
            if let Some(next_name) = self.ref_iters[dup.source].next() {
                self.ref_heap.push(RefHeapEntry {
                    refname: next_name,
                    source: dup.source,
                });
            }
        }

        Ok(Some(best))
    }

    /// Returns the next merged log record in ascending `(refname,
    /// update_index)` order, or `None` when exhausted.
    pub fn next_log(&mut self) -> Result<Option<LogRecord>, StackError> {
        let top = match self.log_heap.pop() {
            Some(e) => e,
            None => return Ok(None),
        };

        let mut best_source = top.source;
        let mut best = self.readers[top.source]
            .get_log_at(&top.key.0, top.key.1)?
            .ok_or_else(|| StackError::Api("merge: log index entry vanished".to_string()))?;

        if let Some(next_key) = self.log_iters[top.source].next() {
            self.log_heap.push(LogHeapEntry {
                key: next_key,
                source: top.source,
            });
        }

        while let Some(peek) = self.log_heap.peek() {
            if peek.key != top.key {
                break;
            }
            let dup = self.log_heap.pop().unwrap();
            if dup.source > best_source {
                best = self.readers[dup.source]
                    .get_log_at(&dup.key.0, dup.key.1)?
                    .ok_or_else(|| StackError::Api("merge: log index entry vanished".to_string()))?;
                best_source = dup.source;
            }
            if let Some(next_key) = self.log_iters[dup.source].next() {
                self.log_heap.push(LogHeapEntry {
                    key: next_key,
                    source: dup.source,
                });
            }
        }

        Ok(Some(best))
    }

    /// Collects all remaining merged ref records into a `Vec`.
    pub fn collect_all_refs(&mut self) -> Result<Vec<RefRecord>, StackError> {
        let mut out = Vec::new();
        while let Some(r) = self.next_ref()? {
            out.push(r);
        }
        Ok(out)
    }

    /// Collects all remaining merged log records into a `Vec`.
    pub fn collect_all_logs(&mut self) -> Result<Vec<LogRecord>, StackError> {
        let mut out = Vec::new();
        while let Some(l) = self.next_log()? {
            out.push(l);
        }
        Ok(out)
    }
}
