use std::ops::{
    Deref,
    DerefMut,
};

use crate::{
    PinnedLru,
    linked_table::Ptr,
};

/// A smart reference to a cached value that tracks modifications.
///
/// Returned by [`PinnedLru::peek_mut`]. Provides transparent access to the
/// underlying value through `Deref` and `DerefMut`.
///
/// # Behavior
///
/// When an `Entry` is dropped:
/// - If the value was **modified** during the borrow (via `DerefMut`,
///   `AsMut`, or [`value_mut()`](Entry::value_mut)), the write counts as a
///   fresh touch: an unpinned entry moves to the most-recently-used end of
///   the recency order. A pinned entry keeps its value update but has no
///   position to move.
/// - If the value was **never modified**, the recency order is untouched, so
///   `peek_mut` without a write is a true peek.
///
/// Read-only access (`Deref`, `AsRef`, [`value()`](Entry::value),
/// [`key()`](Entry::key), [`is_pinned()`](Entry::is_pinned)) never marks the
/// entry as modified.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroUsize;
///
/// use pincache::PinnedLru;
///
/// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
/// cache.insert("A", vec![1, 2, 3]);
/// cache.insert("B", vec![4, 5, 6]);
///
/// // Read-only access leaves "A" as the eviction candidate.
/// if let Some(entry) = cache.peek_mut(&"A") {
///     assert_eq!(entry.key(), &"A");
///     assert_eq!(entry.len(), 3);
/// }
/// assert_eq!(cache.peek_lru().unwrap().0, &"A");
///
/// // A write through the entry promotes "A" past "B".
/// if let Some(mut entry) = cache.peek_mut(&"A") {
///     entry.push(4);
/// }
/// assert_eq!(cache.peek_lru().unwrap().0, &"B");
/// ```
///
/// Writes to pinned entries update the value without any recency effect:
///
/// ```rust
/// use std::num::NonZeroUsize;
///
/// use pincache::PinnedLru;
///
/// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
/// cache.insert_pinned("config", String::from("v1"));
/// cache.insert("a", String::from("-"));
/// cache.insert("b", String::from("-"));
///
/// if let Some(mut entry) = cache.peek_mut(&"config") {
///     assert!(entry.is_pinned());
///     *entry = String::from("v2");
/// }
///
/// // "a" is still the eviction candidate; the pinned write moved nothing.
/// assert_eq!(cache.peek_lru().unwrap().0, &"a");
/// assert_eq!(cache.peek(&"config"), Some(&String::from("v2")));
/// ```
pub struct Entry<'c, K, V> {
    ptr: Ptr,
    dirty: bool,
    cache: &'c mut PinnedLru<K, V>,
}

impl<K, V> Drop for Entry<'_, K, V> {
    fn drop(&mut self) {
        if self.dirty {
            if !self.cache.map.is_pinned_ptr(self.ptr) {
                self.cache.map.touch(self.ptr);
            }

            #[cfg(feature = "statistics")]
            {
                self.cache.statistics.hits += 1;
            }
        }
    }
}

impl<K, V> AsRef<V> for Entry<'_, K, V> {
    fn as_ref(&self) -> &V {
        &self.cache.map[self.ptr]
    }
}

impl<K, V> AsMut<V> for Entry<'_, K, V> {
    fn as_mut(&mut self) -> &mut V {
        self.dirty = true;
        &mut self.cache.map[self.ptr]
    }
}

impl<K, V> Deref for Entry<'_, K, V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.cache.map[self.ptr]
    }
}

impl<K, V> DerefMut for Entry<'_, K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.dirty = true;
        &mut self.cache.map[self.ptr]
    }
}

impl<'c, K, V> Entry<'c, K, V> {
    pub(crate) fn new(ptr: Ptr, cache: &'c mut PinnedLru<K, V>) -> Self {
        Self {
            ptr,
            dirty: false,
            cache,
        }
    }
}

impl<K, V> Entry<'_, K, V> {
    /// Returns a reference to the key for this cache entry.
    ///
    /// Key access never marks the entry as modified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert("hello", vec![1, 2, 3]);
    ///
    /// if let Some(entry) = cache.peek_mut(&"hello") {
    ///     assert_eq!(entry.key(), &"hello");
    /// }
    /// ```
    pub fn key(&self) -> &K {
        self.cache
            .map
            .key_for_ptr(self.ptr)
            .expect("Entry ptr out of date")
    }

    /// Returns whether this entry is currently pinned.
    ///
    /// Pinned entries are exempt from eviction and capacity accounting, and
    /// writes through this `Entry` will not give them a recency position.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    /// cache.insert_pinned("p", 1);
    /// cache.insert("u", 2);
    ///
    /// assert!(cache.peek_mut(&"p").unwrap().is_pinned());
    /// assert!(!cache.peek_mut(&"u").unwrap().is_pinned());
    /// ```
    pub fn is_pinned(&self) -> bool {
        self.cache.map.is_pinned_ptr(self.ptr)
    }

    /// Returns an immutable reference to the cached value.
    ///
    /// Equivalent to going through `Deref` or `AsRef`; does not mark the
    /// entry as modified. For mutable access that counts as a touch, use
    /// [`value_mut()`](Entry::value_mut).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert("key", vec![1, 2, 3]);
    ///
    /// if let Some(entry) = cache.peek_mut(&"key") {
    ///     assert_eq!(entry.value(), &vec![1, 2, 3]);
    ///     assert_eq!(entry.value(), &*entry);
    /// }
    /// ```
    pub fn value(&self) -> &V {
        &self.cache.map[self.ptr]
    }

    /// Returns a mutable reference to the cached value and marks the entry
    /// as modified.
    ///
    /// Always marks the entry as modified, even if the returned reference is
    /// never written through. On drop, an unpinned entry is promoted to the
    /// most-recently-used position; a pinned entry is not.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert("A", vec![1]);
    /// cache.insert("B", vec![2]);
    ///
    /// assert_eq!(cache.peek_lru().unwrap().0, &"A");
    /// if let Some(mut entry) = cache.peek_mut(&"A") {
    ///     entry.value_mut().push(4);
    /// }
    /// assert_eq!(cache.peek_lru().unwrap().0, &"B");
    /// ```
    pub fn value_mut(&mut self) -> &mut V {
        self.dirty = true;
        &mut self.cache.map[self.ptr]
    }
}
