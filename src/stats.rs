/// Counters describing how effective the cache has been.
///
/// Only available with the `statistics` feature enabled. Obtained through
/// [`PinnedLru::statistics`](crate::PinnedLru::statistics) and cleared with
/// [`PinnedLru::reset_statistics`](crate::PinnedLru::reset_statistics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Number of lookups that found a live entry. Writes through
    /// [`Entry`](crate::Entry) also count as hits when the entry is dropped.
    pub hits: u64,
    /// Number of lookups that found nothing.
    pub misses: u64,
    /// Number of unpinned entries displaced to make room for another entry.
    /// Explicit removals and [`PinnedLru::pop_lru`](crate::PinnedLru::pop_lru)
    /// are not counted.
    pub evictions: u64,
}
