use std::{
    error::Error,
    fmt,
};

/// Error returned by [`PinnedLru::try_new`](crate::PinnedLru::try_new) when
/// the requested capacity is zero.
///
/// A zero-capacity cache could never admit an unpinned entry, so construction
/// is rejected up front instead of failing on the first insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidCapacity;

impl fmt::Display for InvalidCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache capacity must be greater than zero")
    }
}

impl Error for InvalidCapacity {}
