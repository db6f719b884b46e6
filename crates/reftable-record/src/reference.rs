/// Reference records: a named pointer to content-addressed bytes, or a
/// symbolic pointer to another reference name.

/// What a live reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// A primary hash value (the content address).
    Value(Vec<u8>),
    /// A symbolic pointer to another reference by name (e.g. `HEAD ->
    /// "refs/heads/master"`).
    Symbolic(String),
}

/// A single reference record as it appears inside a table.
///
/// `target == None` marks the record a tombstone: a deletion of `refname`
/// that must shadow any same-named record in older tables (§9 "Tombstone
/// semantics across compactions").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefRecord {
    /// The reference name this record mutates.
    pub refname: String,
    /// The update index this record was written at. Monotonically
    /// increasing across the stack's lifetime (§3).
    pub update_index: u64,
    /// `Some(target)` for a live reference, `None` for a tombstone.
    pub target: Option<RefTarget>,
}

impl RefRecord {
    /// Constructs a live reference record pointing at a hash value.
    #[must_use]
    pub fn value(refname: impl Into<String>, update_index: u64, hash: Vec<u8>) -> Self {
        Self {
            refname: refname.into(),
            update_index,
            target: Some(RefTarget::Value(hash)),
        }
    }

    /// Constructs a live reference record pointing symbolically at another
    /// reference name.
    #[must_use]
    pub fn symbolic(refname: impl Into<String>, update_index: u64, target: impl Into<String>) -> Self {
        Self {
            refname: refname.into(),
            update_index,
            target: Some(RefTarget::Symbolic(target.into())),
        }
    }

    /// Constructs a tombstone (deletion marker) for `refname`.
    #[must_use]
    pub fn tombstone(refname: impl Into<String>, update_index: u64) -> Self {
        Self {
            refname: refname.into(),
            update_index,
            target: None,
        }
    }

    /// `true` if this record is a deletion marker.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.target.is_none()
    }
}
