#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(all(doc, ENABLE_DOC_AUTO_CFG), feature(doc_auto_cfg))]

mod entry;
mod error;
mod linked_table;
#[cfg(feature = "statistics")]
mod stats;

use std::{
    hash::Hash,
    num::NonZeroUsize,
};

pub use entry::Entry;
pub use error::InvalidCapacity;
use linked_table::{
    LinkedTable,
    Ptr,
};
pub use linked_table::{
    IntoIter,
    Iter,
};
#[cfg(feature = "statistics")]
pub use stats::Statistics;

#[cfg(not(feature = "ahash"))]
type RandomState = std::hash::RandomState;
#[cfg(feature = "ahash")]
type RandomState = ahash::RandomState;

/// A bounded map that evicts the least recently used unpinned entry when it
/// needs room.
///
/// The cache holds at most [`capacity()`](Self::capacity) unpinned entries.
/// Inserting an unpinned entry into a full cache evicts the unpinned entry
/// that was used least recently. Pinned entries are exempt twice over: they
/// are never selected for eviction, and they do not count against the
/// capacity, so the total population may exceed `capacity()` when entries are
/// pinned.
///
/// Whether an operation counts as a "use" is spelled out on each method:
/// [`get()`](Self::get), [`get_mut()`](Self::get_mut),
/// [`insert()`](Self::insert), and
/// [`get_or_insert_with()`](Self::get_or_insert_with) refresh an unpinned
/// entry's position, while [`peek()`](Self::peek),
/// [`peek_lru()`](Self::peek_lru), [`contains_key()`](Self::contains_key),
/// and [`iter()`](Self::iter) leave the order untouched. Pinned entries have
/// no position to refresh; when one is unpinned it rejoins the order as the
/// most recently used entry.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroUsize;
///
/// use pincache::PinnedLru;
///
/// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
/// cache.insert_pinned("root", "/");
/// cache.insert("a", "alpha");
/// cache.insert("b", "beta");
///
/// // "a" is the least recently used unpinned entry, so it is evicted.
/// // "root" is pinned and does not count against the capacity of 2.
/// cache.insert("c", "gamma");
///
/// assert!(cache.contains_key(&"root"));
/// assert!(!cache.contains_key(&"a"));
/// assert_eq!(cache.len(), 3);
/// assert_eq!(cache.unpinned_len(), 2);
/// ```
///
/// Pins can also be applied and released after insertion:
///
/// ```rust
/// use std::num::NonZeroUsize;
///
/// use pincache::PinnedLru;
///
/// let mut cache = PinnedLru::new(NonZeroUsize::new(1).unwrap());
/// cache.insert(1, "one");
/// cache.pin(&1);
///
/// // The slot freed by pinning 1 admits 2 without evicting anything.
/// cache.insert(2, "two");
/// assert_eq!(cache.len(), 2);
///
/// // Unpinning 1 into the full cache evicts 2 to make room for it.
/// cache.unpin(&1);
/// assert!(cache.contains_key(&1));
/// assert!(!cache.contains_key(&2));
/// ```
///
/// # Memory Management
///
/// - Pre-allocates space for `capacity` entries to minimize reallocations
/// - Entries removed by eviction, [`remove()`](Self::remove), or
///   [`pop_lru()`](Self::pop_lru) leave their slot available for reuse;
///   [`shrink_to_fit()`](Self::shrink_to_fit) releases unused storage
#[derive(Clone)]
pub struct PinnedLru<K, V> {
    pub(crate) map: LinkedTable<K, V>,
    pub(crate) capacity: NonZeroUsize,
    #[cfg(feature = "statistics")]
    pub(crate) statistics: Statistics,
}

impl<K: std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for PinnedLru<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unpinned: Vec<_> = self.map.iter().take(self.map.unpinned_len()).collect();
        let pinned: Vec<_> = self.map.iter_pinned().collect();
        f.debug_struct("PinnedLru")
            .field("capacity", &self.capacity)
            .field("unpinned", &unpinned)
            .field("pinned", &pinned)
            .finish()
    }
}

impl<K: Hash + Eq, V> PinnedLru<K, V> {
    /// Creates a new, empty cache with the specified capacity.
    ///
    /// The cache will hold at most `capacity` unpinned entries. When the
    /// unpinned population is at capacity and another unpinned entry needs
    /// room, the least recently used unpinned entry is evicted. Pinned
    /// entries live outside this bound entirely.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The maximum number of unpinned entries the cache can
    ///   hold. Must be greater than zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let cache: PinnedLru<i32, String> = PinnedLru::new(NonZeroUsize::new(100).unwrap());
    /// assert_eq!(cache.capacity(), 100);
    /// assert!(cache.is_empty());
    /// ```
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            map: LinkedTable::with_capacity(capacity.get()),
            capacity,
            #[cfg(feature = "statistics")]
            statistics: Statistics::default(),
        }
    }

    /// Creates a new, empty cache, rejecting a zero capacity.
    ///
    /// This is the fallible counterpart of [`new()`](Self::new) for callers
    /// whose capacity arrives as a plain `usize`, for example from a
    /// configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCapacity`] if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pincache::PinnedLru;
    ///
    /// assert!(PinnedLru::<i32, String>::try_new(0).is_err());
    ///
    /// let cache = PinnedLru::<i32, String>::try_new(3).unwrap();
    /// assert_eq!(cache.capacity(), 3);
    /// ```
    pub fn try_new(capacity: usize) -> Result<Self, InvalidCapacity> {
        NonZeroUsize::new(capacity)
            .map(Self::new)
            .ok_or(InvalidCapacity)
    }

    /// Removes all entries from the cache, pinned entries included.
    ///
    /// After calling this method, the cache will be empty and
    /// [`len()`](Self::len) will return 0. The capacity remains unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert_pinned(2, "two");
    ///
    /// assert_eq!(cache.len(), 2);
    /// cache.clear();
    /// assert_eq!(cache.len(), 0);
    /// assert_eq!(cache.pinned_len(), 0);
    /// assert!(cache.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Returns a reference to the value without updating its position in the
    /// cache.
    ///
    /// This method provides read-only access to a value without affecting the
    /// eviction order. Unlike [`get()`](Self::get), this will not mark the
    /// entry as touched.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up in the cache
    ///
    /// # Returns
    ///
    /// * `Some(&V)` if the key exists in the cache
    /// * `None` if the key is not found
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert(2, "two");
    ///
    /// // Peek doesn't refresh 1, so it is still the eviction candidate.
    /// assert_eq!(cache.peek(&1), Some(&"one"));
    /// cache.insert(3, "three");
    /// assert!(!cache.contains_key(&1));
    /// ```
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// Returns a smart handle to the value, updating the cache only if the
    /// value is modified while borrowed.
    ///
    /// Reading through the returned [`Entry`] leaves the eviction order
    /// untouched. Writing through it marks an unpinned entry as most recently
    /// used when the handle is dropped; a pinned entry stays outside the
    /// order either way.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up in the cache
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    /// cache.insert("a", 1);
    /// cache.insert("b", 2);
    ///
    /// if let Some(mut entry) = cache.peek_mut(&"a") {
    ///     *entry += 10;
    /// }
    ///
    /// // The write promoted "a", leaving "b" as the eviction candidate.
    /// assert_eq!(cache.peek(&"a"), Some(&11));
    /// assert_eq!(cache.peek_lru(), Some((&"b", &2)));
    /// ```
    pub fn peek_mut(&mut self, key: &K) -> Option<Entry<'_, K, V>> {
        let ptr = self.map.get_ptr(key)?;
        Some(Entry::new(ptr, self))
    }

    /// Returns the entry that would be evicted next, without touching it.
    ///
    /// The candidate is always the least recently used unpinned entry.
    /// Pinned entries are never candidates, so a cache holding only pinned
    /// entries has none.
    ///
    /// # Returns
    ///
    /// * `Some((&K, &V))` if at least one unpinned entry exists
    /// * `None` if the cache is empty or every entry is pinned
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// assert_eq!(cache.peek_lru(), None);
    ///
    /// cache.insert(1, "one");
    /// cache.insert(2, "two");
    /// assert_eq!(cache.peek_lru(), Some((&1, &"one")));
    ///
    /// // Touching 1 moves the candidacy to 2.
    /// cache.get(&1);
    /// assert_eq!(cache.peek_lru(), Some((&2, &"two")));
    /// ```
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        self.map.ptr_get_entry(self.map.lru_ptr())
    }

    /// Returns true if the cache contains the given key.
    ///
    /// This method provides a quick way to check for key existence without
    /// affecting the eviction order or retrieving the value. Pinned and
    /// unpinned entries are both reported.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to check for existence
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert_pinned(2, "two");
    ///
    /// assert!(cache.contains_key(&1));
    /// assert!(cache.contains_key(&2));
    /// assert!(!cache.contains_key(&3));
    /// ```
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Reports whether the entry for the given key is pinned.
    ///
    /// # Returns
    ///
    /// * `Some(true)` if the key exists and is pinned
    /// * `Some(false)` if the key exists and is unpinned
    /// * `None` if the key is not in the cache
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert_pinned(2, "two");
    ///
    /// assert_eq!(cache.is_pinned(&1), Some(false));
    /// assert_eq!(cache.is_pinned(&2), Some(true));
    /// assert_eq!(cache.is_pinned(&3), None);
    /// ```
    pub fn is_pinned(&self, key: &K) -> Option<bool> {
        let ptr = self.map.get_ptr(key)?;
        Some(self.map.is_pinned_ptr(ptr))
    }

    /// Gets the value for a key, or inserts it unpinned using the provided
    /// function.
    ///
    /// If the key exists, returns a reference to the existing value and marks
    /// it as touched (pinned entries are returned as-is). If the key doesn't
    /// exist, calls the provided function to create a new value, inserts it
    /// unpinned, and returns a reference to it, evicting the least recently
    /// used unpinned entry first if the cache is full.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up or insert
    /// * `or_insert` - Function called to create the value if the key doesn't
    ///   exist
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    ///
    /// // Insert new value
    /// let value = cache.get_or_insert_with(1, |&key| format!("value_{}", key));
    /// assert_eq!(value, "value_1");
    ///
    /// // Get existing value (function not called)
    /// let value = cache.get_or_insert_with(1, |&key| format!("different_{}", key));
    /// assert_eq!(value, "value_1");
    /// ```
    pub fn get_or_insert_with(&mut self, key: K, or_insert: impl FnOnce(&K) -> V) -> &V {
        self.get_or_insert_with_mut(key, or_insert)
    }

    /// Gets the value for a key, or inserts it unpinned using the provided
    /// function.
    ///
    /// This is the mutable version of
    /// [`get_or_insert_with()`](Self::get_or_insert_with). If the key
    /// exists, returns a mutable reference to the existing value and marks
    /// it as touched (pinned entries are returned as-is). If the key doesn't
    /// exist, calls the provided function to create a new value, inserts it
    /// unpinned, and returns a mutable reference to it.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up or insert
    /// * `or_insert` - Function called to create the value if the key doesn't
    ///   exist
    ///
    /// # Returns
    ///
    /// A mutable reference to the value (existing or newly inserted).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    ///
    /// // Insert new value and modify it
    /// let value = cache.get_or_insert_with_mut(1, |&key| format!("value_{}", key));
    /// value.push_str("_modified");
    /// assert_eq!(cache.peek(&1), Some(&"value_1_modified".to_string()));
    ///
    /// // Get existing value and modify it further (function not called)
    /// let value = cache.get_or_insert_with_mut(1, |&key| format!("different_{}", key));
    /// value.push_str("_again");
    /// assert_eq!(cache.peek(&1), Some(&"value_1_modified_again".to_string()));
    /// ```
    pub fn get_or_insert_with_mut(&mut self, key: K, or_insert: impl FnOnce(&K) -> V) -> &mut V {
        let ptr = match self.map.get_ptr(&key) {
            Some(ptr) => {
                if !self.map.is_pinned_ptr(ptr) {
                    self.map.touch(ptr);
                }
                #[cfg(feature = "statistics")]
                {
                    self.statistics.hits += 1;
                }
                ptr
            }
            None => {
                #[cfg(feature = "statistics")]
                {
                    self.statistics.misses += 1;
                }
                let value = or_insert(&key);
                self.make_room();
                self.map.insert_new(key, value, false)
            }
        };
        &mut self.map[ptr]
    }

    /// Inserts a key-value pair into the cache as an unpinned entry.
    ///
    /// If the key already exists, its value is replaced and the entry ends up
    /// unpinned and marked as touched, whatever its previous pin state. If
    /// the key is new and the cache already holds `capacity` unpinned
    /// entries, the least recently used unpinned entry is evicted to make
    /// room.
    ///
    /// Note that inserting over a pinned key unpins it. The entry rejoins the
    /// recency order as most recently used, and if the unpinned population is
    /// already at capacity the current least recently used entry is evicted
    /// to admit it. Use [`insert_pinned()`](Self::insert_pinned) to update a
    /// pinned entry in place.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to insert or update
    /// * `value` - The value to associate with the key
    ///
    /// # Returns
    ///
    /// An immutable reference to the inserted value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    ///
    /// cache.insert(1, "one");
    /// cache.insert(2, "two");
    /// assert_eq!(cache.len(), 2);
    ///
    /// // This will evict the least recently used entry (key 1)
    /// cache.insert(3, "three");
    /// assert!(!cache.contains_key(&1));
    ///
    /// // Re-inserting 2 refreshes it, so 3 is now the candidate
    /// cache.insert(2, "TWO");
    /// cache.insert(4, "four");
    /// assert!(cache.contains_key(&2));
    /// assert!(!cache.contains_key(&3));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> &V {
        self.insert_mut(key, value)
    }

    /// Inserts a key-value pair into the cache as an unpinned entry.
    ///
    /// This is the mutable version of [`insert()`](Self::insert). If the key
    /// already exists, its value is replaced and the entry ends up unpinned
    /// and marked as touched, whatever its previous pin state. If the key is
    /// new and the cache already holds `capacity` unpinned entries, the least
    /// recently used unpinned entry is evicted to make room.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to insert or update
    /// * `value` - The value to associate with the key
    ///
    /// # Returns
    ///
    /// A mutable reference to the inserted value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    ///
    /// // Insert new value and modify it immediately
    /// let value = cache.insert_mut(1, "one".to_string());
    /// value.push_str("_modified");
    /// assert_eq!(cache.peek(&1), Some(&"one_modified".to_string()));
    ///
    /// // Update existing value
    /// let value = cache.insert_mut(1, "new_one".to_string());
    /// value.push_str("_updated");
    /// assert_eq!(cache.peek(&1), Some(&"new_one_updated".to_string()));
    /// ```
    pub fn insert_mut(&mut self, key: K, value: V) -> &mut V {
        let ptr = self.insert_impl(key, value, false);
        &mut self.map[ptr]
    }

    /// Inserts a key-value pair into the cache as a pinned entry.
    ///
    /// The entry is exempt from eviction and does not count against the
    /// cache's capacity, so this never evicts anything. If the key already
    /// exists, its value is replaced and the entry ends up pinned; an
    /// already-pinned entry keeps its place in the pin order, and an unpinned
    /// one leaves the recency order, freeing a slot for other entries.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to insert or update
    /// * `value` - The value to associate with the key
    ///
    /// # Returns
    ///
    /// An immutable reference to the inserted value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(1).unwrap());
    /// cache.insert_pinned("root", 0);
    ///
    /// // "root" survives any amount of churn in the single unpinned slot.
    /// cache.insert("a", 1);
    /// cache.insert("b", 2);
    /// assert!(cache.contains_key(&"root"));
    /// assert!(!cache.contains_key(&"a"));
    /// assert_eq!(cache.len(), 2);
    /// ```
    ///
    /// Pinning an existing unpinned entry frees its slot:
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(1).unwrap());
    /// cache.insert("k", 1);
    /// cache.insert_pinned("k", 2);
    ///
    /// // The unpinned slot is free again, so "j" fits without an eviction.
    /// cache.insert("j", 3);
    /// assert_eq!(cache.len(), 2);
    /// assert_eq!(cache.peek(&"k"), Some(&2));
    /// ```
    pub fn insert_pinned(&mut self, key: K, value: V) -> &V {
        self.insert_pinned_mut(key, value)
    }

    /// Inserts a key-value pair into the cache as a pinned entry.
    ///
    /// This is the mutable version of
    /// [`insert_pinned()`](Self::insert_pinned). The entry is exempt from
    /// eviction and does not count against the cache's capacity, so this
    /// never evicts anything.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to insert or update
    /// * `value` - The value to associate with the key
    ///
    /// # Returns
    ///
    /// A mutable reference to the inserted value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    ///
    /// let value = cache.insert_pinned_mut("settings", "a=1".to_string());
    /// value.push_str(";b=2");
    ///
    /// assert_eq!(cache.peek(&"settings"), Some(&"a=1;b=2".to_string()));
    /// assert_eq!(cache.is_pinned(&"settings"), Some(true));
    /// ```
    pub fn insert_pinned_mut(&mut self, key: K, value: V) -> &mut V {
        let ptr = self.insert_impl(key, value, true);
        &mut self.map[ptr]
    }

    /// Pins the entry for the given key, exempting it from eviction.
    ///
    /// A pinned entry leaves the recency order and stops counting against
    /// the cache's capacity. Pinning an already-pinned entry has no effect.
    ///
    /// # Returns
    ///
    /// `true` if the key is in the cache, `false` otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(1).unwrap());
    /// cache.insert(1, "one");
    /// assert!(cache.pin(&1));
    /// assert!(!cache.pin(&99));
    ///
    /// // Pinning freed the only unpinned slot, so 2 fits alongside 1.
    /// cache.insert(2, "two");
    /// assert_eq!(cache.len(), 2);
    /// assert!(cache.contains_key(&1));
    /// ```
    pub fn pin(&mut self, key: &K) -> bool {
        let Some(ptr) = self.map.get_ptr(key) else {
            return false;
        };
        if !self.map.is_pinned_ptr(ptr) {
            self.map.set_pinned(ptr);
        }
        true
    }

    /// Unpins the entry for the given key, returning it to the recency order
    /// as the most recently used entry.
    ///
    /// The entry counts against the capacity again, so if the cache already
    /// holds `capacity` unpinned entries the least recently used one is
    /// evicted to make room. Unpinning an entry that is not pinned has no
    /// effect.
    ///
    /// # Returns
    ///
    /// `true` if the key is in the cache, `false` otherwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(1).unwrap());
    /// cache.insert_pinned(1, "one");
    /// cache.insert(2, "two");
    ///
    /// // Readmitting 1 to the single unpinned slot displaces 2.
    /// assert!(cache.unpin(&1));
    /// assert_eq!(cache.is_pinned(&1), Some(false));
    /// assert!(!cache.contains_key(&2));
    ///
    /// assert!(!cache.unpin(&99));
    /// ```
    pub fn unpin(&mut self, key: &K) -> bool {
        let Some(ptr) = self.map.get_ptr(key) else {
            return false;
        };
        if self.map.is_pinned_ptr(ptr) {
            self.make_room();
            self.map.set_unpinned(ptr);
        }
        true
    }

    /// Gets a value from the cache, marking it as touched.
    ///
    /// If the key exists and is unpinned, the entry becomes the most recently
    /// used; a pinned entry is returned without any ordering effect. If the
    /// key doesn't exist, returns `None` and the cache is unchanged.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up
    ///
    /// # Returns
    ///
    /// * `Some(&V)` if the key exists
    /// * `None` if the key doesn't exist
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert(2, "two");
    ///
    /// // Get and mark as recently used
    /// assert_eq!(cache.get(&1), Some(&"one"));
    /// assert_eq!(cache.get(&3), None);
    ///
    /// // 2 is now the least recently used entry
    /// cache.insert(3, "three");
    /// assert!(!cache.contains_key(&2));
    /// assert!(cache.contains_key(&1));
    /// ```
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.get_mut(key).map(|value| &*value)
    }

    /// Gets a mutable reference to a value in the cache, marking it as
    /// touched.
    ///
    /// This is the mutable version of [`get()`](Self::get). If the key exists
    /// and is unpinned, the entry becomes the most recently used; a pinned
    /// entry is returned without any ordering effect. Use
    /// [`peek_mut()`](Self::peek_mut) to mutate a value while only promoting
    /// it if it is actually written through.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to look up
    ///
    /// # Returns
    ///
    /// * `Some(&mut V)` if the key exists
    /// * `None` if the key doesn't exist
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    /// cache.insert(1, vec![1, 2]);
    ///
    /// if let Some(value) = cache.get_mut(&1) {
    ///     value.push(3);
    /// }
    /// assert_eq!(cache.peek(&1), Some(&vec![1, 2, 3]));
    /// ```
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.map.get_ptr(key) {
            Some(ptr) => {
                if !self.map.is_pinned_ptr(ptr) {
                    self.map.touch(ptr);
                }
                #[cfg(feature = "statistics")]
                {
                    self.statistics.hits += 1;
                }
                Some(&mut self.map[ptr])
            }
            None => {
                #[cfg(feature = "statistics")]
                {
                    self.statistics.misses += 1;
                }
                None
            }
        }
    }

    /// Removes and returns the least recently used unpinned entry.
    ///
    /// Pinned entries are never returned. Explicitly popping an entry is not
    /// counted as an eviction by the `statistics` feature.
    ///
    /// # Returns
    ///
    /// * `Some((K, V))` if at least one unpinned entry exists
    /// * `None` if the cache is empty or every entry is pinned
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert(2, "two");
    ///
    /// assert_eq!(cache.pop_lru(), Some((1, "one")));
    /// assert_eq!(cache.len(), 1);
    ///
    /// // A fully pinned cache has nothing to pop.
    /// cache.pin(&2);
    /// assert_eq!(cache.pop_lru(), None);
    /// assert_eq!(cache.len(), 1);
    /// ```
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let node = self.map.remove_ptr(self.map.lru_ptr())?;
        Some((node.key, node.value))
    }

    /// Removes a specific entry from the cache, pinned or not.
    ///
    /// If the key exists, removes it from the cache and returns the
    /// associated value. If the key doesn't exist, returns `None` and the
    /// cache is unchanged.
    ///
    /// # Arguments
    ///
    /// * `key` - The key to remove from the cache
    ///
    /// # Returns
    ///
    /// * `Some(V)` if the key existed and was removed
    /// * `None` if the key was not found
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert_pinned(2, "two");
    ///
    /// assert_eq!(cache.remove(&1), Some("one"));
    /// assert_eq!(cache.remove(&1), None); // Already removed
    ///
    /// // Pinning does not protect against explicit removal.
    /// assert_eq!(cache.remove(&2), Some("two"));
    /// assert!(cache.is_empty());
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key).map(|node| node.value)
    }

    /// Returns true if the cache contains no entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// assert!(cache.is_empty());
    ///
    /// cache.insert(1, "one");
    /// assert!(!cache.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of entries currently in the cache, pinned entries
    /// included.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// assert_eq!(cache.len(), 0);
    ///
    /// cache.insert(1, "one");
    /// cache.insert_pinned(2, "two");
    /// assert_eq!(cache.len(), 2);
    /// ```
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns the number of unpinned entries currently in the cache.
    ///
    /// This is the population the capacity bound applies to; it never
    /// exceeds [`capacity()`](Self::capacity).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert_pinned(2, "two");
    /// cache.insert(3, "three");
    ///
    /// assert_eq!(cache.unpinned_len(), 2);
    /// ```
    pub fn unpinned_len(&self) -> usize {
        self.map.unpinned_len()
    }

    /// Returns the number of pinned entries currently in the cache.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert_pinned(2, "two");
    ///
    /// assert_eq!(cache.pinned_len(), 1);
    /// cache.unpin(&2);
    /// assert_eq!(cache.pinned_len(), 0);
    /// ```
    pub fn pinned_len(&self) -> usize {
        self.map.pinned_len()
    }

    /// Returns the maximum number of unpinned entries the cache can hold.
    ///
    /// This value is set when the cache is created and doesn't change during
    /// the cache's lifetime. Pinned entries are not counted against it, so
    /// [`len()`](Self::len) may exceed it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    /// cache.insert_pinned("cfg", 0);
    /// cache.insert("a", 1);
    /// cache.insert("b", 2);
    /// cache.insert("c", 3);
    ///
    /// assert_eq!(cache.capacity(), 2);
    /// assert_eq!(cache.len(), 3);
    /// assert_eq!(cache.unpinned_len(), 2);
    /// ```
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns an iterator over cache entries.
    ///
    /// Unpinned entries come first, from least recently used to most
    /// recently used, so the first yielded entry matches
    /// [`peek_lru()`](Self::peek_lru). Pinned entries follow in the order
    /// they were pinned. Iterating does not touch any entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert(1, "a");
    /// cache.insert_pinned(2, "b");
    /// cache.insert(3, "c");
    ///
    /// // Touching 1 reorders the unpinned entries but not the pinned tail.
    /// cache.get(&1);
    ///
    /// let items: Vec<_> = cache.iter().collect();
    /// assert_eq!(items, [(&3, &"c"), (&1, &"a"), (&2, &"b")]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.map.iter()
    }

    /// Returns an iterator over only the pinned entries, in the order they
    /// were pinned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert_pinned("a", 1);
    /// cache.insert("b", 2);
    /// cache.insert_pinned("c", 3);
    ///
    /// let pinned: Vec<_> = cache.iter_pinned().collect();
    /// assert_eq!(pinned, [(&"a", &1), (&"c", &3)]);
    /// ```
    pub fn iter_pinned(&self) -> Iter<'_, K, V> {
        self.map.iter_pinned()
    }

    /// Returns an iterator over the keys in the cache, in the same order as
    /// [`iter()`](Self::iter).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert("A", 1);
    /// cache.insert("B", 2);
    ///
    /// let keys: Vec<_> = cache.keys().collect();
    /// assert_eq!(keys, [&"A", &"B"]);
    /// ```
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    /// Returns an iterator over the values in the cache, in the same order as
    /// [`iter()`](Self::iter).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert("A", 1);
    /// cache.insert("B", 2);
    ///
    /// let values: Vec<_> = cache.values().collect();
    /// assert_eq!(values, [&1, &2]);
    /// ```
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Retains only the entries for which the predicate returns `true`.
    ///
    /// Entries are visited in the same order as [`iter()`](Self::iter):
    /// unpinned entries from least recently used to most recently used, then
    /// pinned entries in pin order. The predicate receives a mutable
    /// reference to each value, so retained values can be updated in place.
    /// Surviving entries keep their relative order and pin state.
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that takes `(&K, &mut V)` and returns `true` for
    ///   entries that should be kept, `false` for entries that should be
    ///   removed
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(5).unwrap());
    /// cache.insert(1, "apple");
    /// cache.insert(2, "banana");
    /// cache.insert(3, "cherry");
    /// cache.pin(&2);
    ///
    /// // Pinned entries are filtered like any other.
    /// cache.retain(|&key, _value| key % 2 == 1);
    ///
    /// assert_eq!(cache.len(), 2);
    /// assert_eq!(cache.pinned_len(), 0);
    /// assert!(cache.contains_key(&1));
    /// assert!(cache.contains_key(&3));
    /// ```
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let recency_head = self.map.lru_ptr();
        self.map.retain_chain(recency_head, &mut f);
        let pinned_head = self.map.pinned_head();
        self.map.retain_chain(pinned_head, &mut f);
    }

    /// Shrinks the internal storage to fit the current number of entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(100).unwrap());
    /// cache.insert(1, "one");
    /// cache.insert(2, "two");
    /// cache.remove(&2);
    ///
    /// cache.shrink_to_fit();
    /// assert_eq!(cache.peek(&1), Some(&"one"));
    /// ```
    pub fn shrink_to_fit(&mut self) {
        self.map.shrink_to_fit();
    }

    fn insert_impl(&mut self, key: K, value: V, pinned: bool) -> Ptr {
        match self.map.get_ptr(&key) {
            Some(ptr) => {
                self.map[ptr] = value;
                self.apply_pin_state(ptr, pinned);
                ptr
            }
            None => {
                if !pinned {
                    self.make_room();
                }
                self.map.insert_new(key, value, pinned)
            }
        }
    }

    fn apply_pin_state(&mut self, ptr: Ptr, pinned: bool) {
        match (self.map.is_pinned_ptr(ptr), pinned) {
            (false, false) => self.map.touch(ptr),
            (false, true) => self.map.set_pinned(ptr),
            (true, false) => {
                self.make_room();
                self.map.set_unpinned(ptr);
            }
            // Re-adding a pinned entry as pinned keeps its place in the pin
            // order.
            (true, true) => {}
        }
    }

    /// Evicts the least recently used unpinned entry if the unpinned
    /// population is at capacity. Must be called before an entry joins the
    /// recency chain.
    fn make_room(&mut self) {
        if self.map.unpinned_len() < self.capacity.get() {
            return;
        }
        let victim = self.map.lru_ptr();
        debug_assert!(!victim.is_null(), "Full cache must have an eviction candidate");
        self.map.remove_ptr(victim);
        #[cfg(feature = "statistics")]
        {
            self.statistics.evictions += 1;
        }
    }
}

#[cfg(feature = "statistics")]
impl<K, V> PinnedLru<K, V> {
    /// Returns a snapshot of the hit, miss, and eviction counters.
    ///
    /// Hits and misses are counted by [`get()`](Self::get),
    /// [`get_mut()`](Self::get_mut), and
    /// [`get_or_insert_with()`](Self::get_or_insert_with); a write through
    /// [`peek_mut()`](Self::peek_mut) also counts as a hit when the handle is
    /// dropped. Evictions count only entries displaced to make room, not
    /// explicit removals.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    /// cache.insert("a", 1);
    /// cache.get(&"a");
    /// cache.get(&"missing");
    /// cache.insert("b", 2);
    /// cache.insert("c", 3);
    ///
    /// let stats = cache.statistics();
    /// assert_eq!(stats.hits, 1);
    /// assert_eq!(stats.misses, 1);
    /// assert_eq!(stats.evictions, 1);
    /// ```
    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// Resets the hit, miss, and eviction counters to zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    /// cache.insert("a", 1);
    /// cache.get(&"a");
    ///
    /// cache.reset_statistics();
    /// assert_eq!(cache.statistics(), Default::default());
    /// ```
    pub fn reset_statistics(&mut self) {
        self.statistics = Statistics::default();
    }
}

impl<K, V> PinnedLru<K, V> {
    #[doc(hidden)]
    #[cfg(any(test, all(debug_assertions, feature = "internal-debugging")))]
    pub fn debug_validate(&self) {
        self.map.validate();
        assert!(
            self.map.unpinned_len() <= self.capacity.get(),
            "Unpinned population exceeds the capacity bound"
        );
        assert_eq!(
            self.map.len(),
            self.map.unpinned_len() + self.map.pinned_len(),
            "Pinned and unpinned counts should partition the cache"
        );
    }
}

impl<K, V> IntoIterator for PinnedLru<K, V> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    /// Converts the cache into an iterator over key-value pairs.
    ///
    /// The iteration order matches [`iter()`](PinnedLru::iter): unpinned
    /// entries from least recently used to most recently used, then pinned
    /// entries in pin order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(3).unwrap());
    /// cache.insert(1, "first");
    /// cache.insert_pinned(2, "second");
    /// cache.insert(3, "third");
    ///
    /// let pairs: Vec<_> = cache.into_iter().collect();
    /// assert_eq!(pairs, [(1, "first"), (3, "third"), (2, "second")]);
    /// ```
    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a PinnedLru<K, V> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    /// Iterates over the cache by reference, in the same order as
    /// [`iter()`](PinnedLru::iter).
    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}

impl<K: Hash + Eq, V> Extend<(K, V)> for PinnedLru<K, V> {
    /// Extends the cache with key-value pairs from an iterator.
    ///
    /// Each pair is inserted unpinned, exactly as by
    /// [`insert()`](PinnedLru::insert), so earlier pairs may be evicted by
    /// later ones once the capacity is reached.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::num::NonZeroUsize;
    ///
    /// use pincache::PinnedLru;
    ///
    /// let mut cache = PinnedLru::new(NonZeroUsize::new(2).unwrap());
    /// cache.extend([(1, "one"), (2, "two"), (3, "three")]);
    ///
    /// assert_eq!(cache.len(), 2);
    /// assert!(!cache.contains_key(&1));
    /// ```
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for PinnedLru<K, V> {
    /// Creates a new cache from an iterator of key-value pairs.
    ///
    /// This method consumes the iterator and constructs a new cache, with a
    /// **capacity of at least 1** and at most the number of distinct keys in
    /// the iterator. All entries are unpinned, and a key that appears more
    /// than once keeps its last value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pincache::PinnedLru;
    ///
    /// let cache: PinnedLru<i32, &str> =
    ///     [(1, "a"), (2, "b"), (1, "c")].into_iter().collect();
    ///
    /// assert_eq!(cache.len(), 2);
    /// assert_eq!(cache.capacity(), 2);
    /// assert_eq!(cache.peek(&1), Some(&"c"));
    /// ```
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = LinkedTable::default();
        for (key, value) in iter {
            match map.get_ptr(&key) {
                Some(ptr) => {
                    map[ptr] = value;
                    map.touch(ptr);
                }
                None => {
                    map.insert_new(key, value, false);
                }
            }
        }

        let capacity = NonZeroUsize::new(map.len().max(1)).unwrap();
        Self {
            map,
            capacity,
            #[cfg(feature = "statistics")]
            statistics: Statistics::default(),
        }
    }
}
