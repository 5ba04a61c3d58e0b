use std::fmt;

/// The kind of change a watch event reports.
///
/// `Added` and `Modified` both carry the full current resource and are applied identically;
/// `Deleted` is only guaranteed to carry the resource's identity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
}

// === impl EventKind ===

impl EventKind {
    /// Returns true for events that store the resource rather than removing it.
    #[inline]
    pub fn is_upsert(self) -> bool {
        matches!(self, Self::Added | Self::Modified)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => "added".fmt(f),
            Self::Modified => "modified".fmt(f),
            Self::Deleted => "deleted".fmt(f),
        }
    }
}
