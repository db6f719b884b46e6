//! # Table — immutable on-disk reference/log storage
//!
//! A single table file holds a sorted section of reference records and a
//! sorted section of log records, written once by [`TableWriter`] and never
//! modified afterward — only superseded by compaction.
//!
//! ## File layout
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ DATA SECTION (ref records, then log records, each framed)      │
//! │                                                               │
//! │ crc32 (u32) | kind (u8) | refname_len (u32) | refname          │
//! │ update_index (u64) | live (u8) | ... kind-specific payload      │
//! ├───────────────────────────────────────────────────────────────┤
//! │ BLOOM SECTION (serialized BloomFilter over touched refnames)    │
//! ├───────────────────────────────────────────────────────────────┤
//! │ REF INDEX SECTION: refname_len (u32) | refname | offset (u64)  │
//! ├───────────────────────────────────────────────────────────────┤
//! │ LOG INDEX SECTION: refname_len (u32) | refname                │
//! │                    | update_index (u64) | offset (u64)         │
//! ├───────────────────────────────────────────────────────────────┤
//! │ FOOTER (56 bytes, magic `RTB1`)                                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The per-record CRC32 covers everything in the record after the CRC
//! itself, detecting silent disk corruption on reads. [`MergeIterator`]
//! walks a set of tables in sorted order to produce the stack's merged
//! view, used both for reads and for compaction.

mod format;
mod merge;
mod reader;
mod writer;

pub use format::{read_footer, Footer, FOOTER_BYTES, TABLE_MAGIC};
pub use merge::MergeIterator;
pub use reader::TableReader;
pub use writer::{FinishedTable, TableWriter};

#[cfg(test)]
mod tests;
