use std::{
    hash::{
        BuildHasher,
        Hash,
    },
    ops::{
        Index,
        IndexMut,
    },
};

use hashbrown::HashTable;

use crate::RandomState;

mod arena;

use arena::{
    Arena,
    Node,
};
pub(crate) use arena::Ptr;

/// One intrusive list threaded through arena slots. `head`/`tail` are null
/// when empty; member slots are null-terminated at both ends.
#[derive(Debug, Clone, Copy, Default)]
struct Chain {
    head: Ptr,
    tail: Ptr,
    len: usize,
}

impl Chain {
    fn push_tail<K, T>(&mut self, arena: &mut Arena<K, T>, ptr: Ptr) {
        let tail = self.tail;
        {
            let slot = arena.links_mut(ptr);
            slot.prev = tail;
            slot.next = Ptr::null();
        }
        if tail.is_null() {
            self.head = ptr;
        } else {
            arena.links_mut(tail).next = ptr;
        }
        self.tail = ptr;
        self.len += 1;
    }

    fn unlink<K, T>(&mut self, arena: &mut Arena<K, T>, ptr: Ptr) {
        let (prev, next) = {
            let slot = arena.links(ptr);
            (slot.prev, slot.next)
        };
        if prev.is_null() {
            debug_assert_eq!(self.head, ptr, "Unlinked a ptr that was not a member");
            self.head = next;
        } else {
            arena.links_mut(prev).next = next;
        }
        if next.is_null() {
            debug_assert_eq!(self.tail, ptr, "Unlinked a ptr that was not a member");
            self.tail = prev;
        } else {
            arena.links_mut(next).prev = prev;
        }
        let slot = arena.links_mut(ptr);
        slot.prev = Ptr::null();
        slot.next = Ptr::null();
        self.len -= 1;
    }

    fn move_to_tail<K, T>(&mut self, arena: &mut Arena<K, T>, ptr: Ptr) {
        if self.tail == ptr {
            return;
        }
        self.unlink(arena, ptr);
        self.push_tail(arena, ptr);
    }
}

/// Key-to-slot index fused with the two entry chains: `recency` strings the
/// unpinned entries from least to most recently used, `pinned` strings the
/// pinned entries in pin order. Every live slot is a member of exactly one
/// chain, selected by its `pinned` flag.
#[derive(Clone)]
pub(crate) struct LinkedTable<K, T> {
    arena: Arena<K, T>,
    table: HashTable<Ptr>,
    hasher: RandomState,
    recency: Chain,
    pinned: Chain,
}

impl<K, T> Default for LinkedTable<K, T> {
    fn default() -> Self {
        LinkedTable {
            arena: Arena::new(),
            table: HashTable::new(),
            hasher: RandomState::default(),
            recency: Chain::default(),
            pinned: Chain::default(),
        }
    }
}

impl<K: std::fmt::Debug, T: std::fmt::Debug> std::fmt::Debug for LinkedTable<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unpinned: Vec<_> = Iter {
            map: self,
            cursor: self.recency.head,
            next_chain: Ptr::null(),
        }
        .collect();
        let pinned: Vec<_> = self.iter_pinned().collect();

        f.debug_struct("LinkedTable")
            .field("len", &self.len())
            .field("unpinned", &unpinned)
            .field("pinned", &pinned)
            .finish()
    }
}

impl<K, T> LinkedTable<K, T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        LinkedTable {
            arena: Arena::with_capacity(capacity),
            table: HashTable::with_capacity(capacity),
            hasher: RandomState::default(),
            recency: Chain::default(),
            pinned: Chain::default(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn unpinned_len(&self) -> usize {
        self.recency.len
    }

    pub(crate) fn pinned_len(&self) -> usize {
        self.pinned.len
    }

    /// Current eviction candidate: least recently used unpinned entry.
    pub(crate) fn lru_ptr(&self) -> Ptr {
        self.recency.head
    }

    pub(crate) fn pinned_head(&self) -> Ptr {
        self.pinned.head
    }

    pub(crate) fn ptr_get(&self, ptr: Ptr) -> Option<&T> {
        self.arena.get(ptr).map(|node| &node.value)
    }

    pub(crate) fn ptr_get_mut(&mut self, ptr: Ptr) -> Option<&mut T> {
        self.arena.get_mut(ptr).map(|node| &mut node.value)
    }

    pub(crate) fn ptr_get_entry(&self, ptr: Ptr) -> Option<(&K, &T)> {
        self.arena.get(ptr).map(|node| (&node.key, &node.value))
    }

    pub(crate) fn key_for_ptr(&self, ptr: Ptr) -> Option<&K> {
        self.arena.get(ptr).map(|node| &node.key)
    }

    pub(crate) fn is_pinned_ptr(&self, ptr: Ptr) -> bool {
        self.arena[ptr].pinned
    }

    /// Promote an unpinned entry to the most recently used position.
    pub(crate) fn touch(&mut self, ptr: Ptr) {
        debug_assert!(!self.arena[ptr].pinned, "Pinned entries have no recency position");
        self.recency.move_to_tail(&mut self.arena, ptr);
    }

    /// Move an unpinned entry onto the pinned chain. Frees its recency slot.
    pub(crate) fn set_pinned(&mut self, ptr: Ptr) {
        debug_assert!(!self.arena[ptr].pinned, "Entry is already pinned");
        self.recency.unlink(&mut self.arena, ptr);
        self.arena[ptr].pinned = true;
        self.pinned.push_tail(&mut self.arena, ptr);
    }

    /// Move a pinned entry back onto the recency chain, at the most recently
    /// used end. The caller is responsible for making room first.
    pub(crate) fn set_unpinned(&mut self, ptr: Ptr) {
        debug_assert!(self.arena[ptr].pinned, "Entry is not pinned");
        self.pinned.unlink(&mut self.arena, ptr);
        self.arena[ptr].pinned = false;
        self.recency.push_tail(&mut self.arena, ptr);
    }

    #[track_caller]
    pub(crate) fn remove_ptr(&mut self, ptr: Ptr) -> Option<Node<K, T>> {
        if !self.arena.is_live(ptr) {
            return None;
        }
        let hash = self.arena[ptr].hash;
        match self.table.find_entry(hash, |p| *p == ptr) {
            Ok(occupied) => {
                occupied.remove();
            }
            Err(_) => {
                debug_assert!(false, "Pointer not found in table: {ptr:?}");
                return None;
            }
        }
        Some(self.detach_and_free(ptr))
    }

    fn detach_and_free(&mut self, ptr: Ptr) -> Node<K, T> {
        if self.arena[ptr].pinned {
            self.pinned.unlink(&mut self.arena, ptr);
        } else {
            self.recency.unlink(&mut self.arena, ptr);
        }
        self.arena.free(ptr).into_node()
    }

    /// Walks one chain from `cursor`, removing every entry the predicate
    /// rejects. The next pointer is read before the predicate runs, so
    /// removal of the current entry cannot derail the walk.
    pub(crate) fn retain_chain<F>(&mut self, mut cursor: Ptr, f: &mut F)
    where
        F: FnMut(&K, &mut T) -> bool,
    {
        while !cursor.is_null() {
            let next = self.arena.links(cursor).next;
            let node = &mut self.arena[cursor];
            if !f(&node.key, &mut node.value) {
                self.remove_ptr(cursor);
            }
            cursor = next;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.table.clear();
        self.arena.clear();
        self.recency = Chain::default();
        self.pinned = Chain::default();
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        let Self { arena, table, .. } = self;
        table.shrink_to_fit(|p| arena[*p].hash);
        arena.shrink_to_fit();
    }

    /// All live entries: the recency chain in least to most recently used
    /// order, then the pinned chain in pin order.
    pub(crate) fn iter(&self) -> Iter<'_, K, T> {
        Iter {
            map: self,
            cursor: self.recency.head,
            next_chain: self.pinned.head,
        }
    }

    pub(crate) fn iter_pinned(&self) -> Iter<'_, K, T> {
        Iter {
            map: self,
            cursor: self.pinned.head,
            next_chain: Ptr::null(),
        }
    }

    pub(crate) fn into_iter(self) -> IntoIter<K, T> {
        IntoIter {
            arena: self.arena,
            cursor: self.recency.head,
            next_chain: self.pinned.head,
        }
    }

    #[cfg(any(test, all(debug_assertions, feature = "internal-debugging")))]
    pub(crate) fn validate(&self) {
        self.validate_chain(&self.recency, false);
        self.validate_chain(&self.pinned, true);
        assert_eq!(
            self.table.len(),
            self.recency.len + self.pinned.len,
            "Chains and table should cover the same entries"
        );
        assert_eq!(
            self.table.len(),
            self.arena.occupied_count(),
            "Arena occupancy and table should agree"
        );
        for ptr in self.table.iter().copied() {
            assert!(self.arena.is_live(ptr), "Table holds a stale ptr: {ptr:?}");
        }
    }

    #[cfg(any(test, all(debug_assertions, feature = "internal-debugging")))]
    fn validate_chain(&self, chain: &Chain, pinned: bool) {
        if chain.len == 0 {
            assert!(chain.head.is_null(), "Empty chain should have no head");
            assert!(chain.tail.is_null(), "Empty chain should have no tail");
            return;
        }

        assert!(!chain.head.is_null(), "Head pointer is invalid");
        assert!(!chain.tail.is_null(), "Tail pointer is invalid");
        assert!(
            self.arena.links(chain.head).prev.is_null(),
            "Head should have no previous link"
        );
        assert!(
            self.arena.links(chain.tail).next.is_null(),
            "Tail should have no next link"
        );

        let mut count = 0;
        let mut cursor = chain.head;
        let mut prev = Ptr::null();
        while !cursor.is_null() {
            assert!(self.arena.is_live(cursor), "Chain holds a stale ptr: {cursor:?}");
            assert_eq!(
                self.arena[cursor].pinned, pinned,
                "Entry is on the wrong chain: {cursor:?}"
            );
            assert_eq!(
                self.arena.links(cursor).prev,
                prev,
                "Backward link disagrees with forward walk: {cursor:?}"
            );
            let hash = self.arena[cursor].hash;
            assert!(
                self.table.find(hash, |p| *p == cursor).is_some(),
                "Chain member missing from table: {cursor:?}"
            );
            prev = cursor;
            cursor = self.arena.links(cursor).next;
            count += 1;
        }
        assert_eq!(prev, chain.tail, "Forward walk should end at the tail");
        assert_eq!(count, chain.len, "Chain length counter is wrong");
    }
}

impl<K: Hash + Eq, T> LinkedTable<K, T> {
    pub(crate) fn get_ptr(&self, key: &K) -> Option<Ptr> {
        let hash = self.hasher.hash_one(key);
        self.table
            .find(hash, |p| self.arena[*p].key == *key)
            .copied()
    }

    pub(crate) fn get(&self, key: &K) -> Option<&T> {
        self.ptr_get(self.get_ptr(key)?)
    }

    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.get_ptr(key).is_some()
    }

    /// Insert an entry for a key that is not present, linking it at the tail
    /// of the chain its pin state selects.
    pub(crate) fn insert_new(&mut self, key: K, value: T, pinned: bool) -> Ptr {
        debug_assert!(!self.contains_key(&key), "Key is already present");
        let hash = self.hasher.hash_one(&key);
        let ptr = self.arena.alloc(key, value, hash, pinned);
        let Self { arena, table, .. } = self;
        table.insert_unique(hash, ptr, |p| arena[*p].hash);
        if pinned {
            self.pinned.push_tail(&mut self.arena, ptr);
        } else {
            self.recency.push_tail(&mut self.arena, ptr);
        }
        ptr
    }

    #[track_caller]
    pub(crate) fn remove(&mut self, key: &K) -> Option<Node<K, T>> {
        let hash = self.hasher.hash_one(key);
        let Self { arena, table, .. } = self;
        match table.find_entry(hash, |p| arena[*p].key == *key) {
            Ok(occupied) => {
                let (ptr, _) = occupied.remove();
                Some(self.detach_and_free(ptr))
            }
            Err(_) => None,
        }
    }
}

impl<K, T> Index<Ptr> for LinkedTable<K, T> {
    type Output = T;

    fn index(&self, index: Ptr) -> &Self::Output {
        &self.arena[index].value
    }
}

impl<K, T> IndexMut<Ptr> for LinkedTable<K, T> {
    fn index_mut(&mut self, index: Ptr) -> &mut Self::Output {
        &mut self.arena[index].value
    }
}

/// Borrowing iterator over cache entries. Walks one chain to its end, then
/// a second one; see [`PinnedLru::iter`](crate::PinnedLru::iter) for the
/// order guarantees.
#[derive(Debug, Clone, Copy)]
pub struct Iter<'a, K, T> {
    map: &'a LinkedTable<K, T>,
    cursor: Ptr,
    next_chain: Ptr,
}

impl<'a, K, T> Iterator for Iter<'a, K, T> {
    type Item = (&'a K, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_null() {
            self.cursor = std::mem::replace(&mut self.next_chain, Ptr::null());
            if self.cursor.is_null() {
                return None;
            }
        }
        let ptr = self.cursor;
        self.cursor = self.map.arena.links(ptr).next;
        let node = self.map.arena.get(ptr)?;
        Some((&node.key, &node.value))
    }
}

/// Owning iterator over cache entries, in the same order as [`Iter`].
pub struct IntoIter<K, T> {
    arena: Arena<K, T>,
    cursor: Ptr,
    next_chain: Ptr,
}

impl<K, T> Iterator for IntoIter<K, T> {
    type Item = (K, T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_null() {
            self.cursor = std::mem::replace(&mut self.next_chain, Ptr::null());
            if self.cursor.is_null() {
                return None;
            }
        }
        let slot = self.arena.free(self.cursor);
        self.cursor = slot.next;
        let node = slot.into_node();
        Some((node.key, node.value))
    }
}

#[cfg(test)]
mod tests {
    use ntest::timeout;

    use super::*;

    fn unpinned_keys(map: &LinkedTable<i32, String>) -> Vec<i32> {
        let mut keys: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        keys.truncate(map.unpinned_len());
        keys
    }

    #[test]
    #[timeout(1000)]
    fn test_new_and_default() {
        let map: LinkedTable<i32, String> = LinkedTable::default();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.unpinned_len(), 0);
        assert_eq!(map.pinned_len(), 0);
        assert!(map.lru_ptr().is_null());
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_with_capacity() {
        let map: LinkedTable<i32, String> = LinkedTable::with_capacity(10);
        assert!(map.is_empty());
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_insert_new_unpinned_order() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), false);
        map.insert_new(3, "three".to_string(), false);

        assert_eq!(map.len(), 3);
        assert_eq!(map.unpinned_len(), 3);
        assert_eq!(map.pinned_len(), 0);
        assert_eq!(unpinned_keys(&map), vec![1, 2, 3]);
        assert_eq!(map.key_for_ptr(map.lru_ptr()), Some(&1));
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_insert_new_pinned_never_on_recency_chain() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), true);
        map.insert_new(2, "two".to_string(), false);
        map.insert_new(3, "three".to_string(), true);

        assert_eq!(map.len(), 3);
        assert_eq!(map.unpinned_len(), 1);
        assert_eq!(map.pinned_len(), 2);
        assert_eq!(unpinned_keys(&map), vec![2]);

        let pinned: Vec<_> = map.iter_pinned().map(|(k, _)| *k).collect();
        assert_eq!(pinned, vec![1, 3]);
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_get_operations() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), true);

        assert_eq!(map.get(&1), Some(&"one".to_string()));
        assert_eq!(map.get(&2), Some(&"two".to_string()));
        assert_eq!(map.get(&3), None);
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&3));

        let ptr = map.get_ptr(&1).unwrap();
        assert_eq!(map.ptr_get(ptr), Some(&"one".to_string()));
        assert_eq!(map.ptr_get_entry(ptr), Some((&1, &"one".to_string())));
        assert_eq!(map.key_for_ptr(ptr), Some(&1));
        assert!(!map.is_pinned_ptr(ptr));
        assert!(map.is_pinned_ptr(map.get_ptr(&2).unwrap()));

        *map.ptr_get_mut(ptr).unwrap() = "ONE".to_string();
        assert_eq!(map[ptr], "ONE".to_string());

        map[ptr] = "one".to_string();
        assert_eq!(map.get(&1), Some(&"one".to_string()));
    }

    #[test]
    #[timeout(1000)]
    fn test_touch_promotes_to_mru() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), false);
        map.insert_new(3, "three".to_string(), false);

        let head = map.get_ptr(&1).unwrap();
        map.touch(head);
        assert_eq!(unpinned_keys(&map), vec![2, 3, 1]);
        map.validate();

        let middle = map.get_ptr(&3).unwrap();
        map.touch(middle);
        assert_eq!(unpinned_keys(&map), vec![2, 1, 3]);
        map.validate();

        let tail = map.get_ptr(&3).unwrap();
        map.touch(tail);
        assert_eq!(unpinned_keys(&map), vec![2, 1, 3]);
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_touch_single_entry() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        let ptr = map.get_ptr(&1).unwrap();
        map.touch(ptr);
        assert_eq!(unpinned_keys(&map), vec![1]);
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_set_pinned_moves_between_chains() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), false);
        map.insert_new(3, "three".to_string(), false);

        let ptr = map.get_ptr(&2).unwrap();
        map.set_pinned(ptr);

        assert_eq!(map.unpinned_len(), 2);
        assert_eq!(map.pinned_len(), 1);
        assert!(map.is_pinned_ptr(ptr));
        assert_eq!(unpinned_keys(&map), vec![1, 3]);
        let pinned: Vec<_> = map.iter_pinned().map(|(k, _)| *k).collect();
        assert_eq!(pinned, vec![2]);
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_set_unpinned_links_at_mru_end() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), true);
        map.insert_new(2, "two".to_string(), false);
        map.insert_new(3, "three".to_string(), false);

        let ptr = map.get_ptr(&1).unwrap();
        map.set_unpinned(ptr);

        assert_eq!(map.unpinned_len(), 3);
        assert_eq!(map.pinned_len(), 0);
        assert!(!map.is_pinned_ptr(ptr));
        assert_eq!(unpinned_keys(&map), vec![2, 3, 1]);
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_pin_unpin_round_trip_keeps_chains_consistent() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), false);

        let ptr = map.get_ptr(&1).unwrap();
        map.set_pinned(ptr);
        map.validate();
        map.set_unpinned(ptr);
        map.validate();

        assert_eq!(unpinned_keys(&map), vec![2, 1]);
        assert_eq!(map.pinned_len(), 0);
    }

    #[test]
    #[timeout(1000)]
    fn test_remove_head_middle_tail() {
        let mut map = LinkedTable::default();
        for i in 1..=4 {
            map.insert_new(i, i.to_string(), false);
        }

        let removed = map.remove(&1).unwrap();
        assert_eq!(removed.key, 1);
        assert_eq!(removed.value, "1");
        assert!(!removed.pinned);
        assert_eq!(unpinned_keys(&map), vec![2, 3, 4]);
        map.validate();

        map.remove(&3).unwrap();
        assert_eq!(unpinned_keys(&map), vec![2, 4]);
        map.validate();

        map.remove(&4).unwrap();
        assert_eq!(unpinned_keys(&map), vec![2]);
        map.validate();

        map.remove(&2).unwrap();
        assert!(map.is_empty());
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_remove_absent_key() {
        let mut map: LinkedTable<i32, String> = LinkedTable::default();
        assert!(map.remove(&1).is_none());
        map.insert_new(1, "one".to_string(), false);
        assert!(map.remove(&2).is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    #[timeout(1000)]
    fn test_remove_pinned_keeps_recency_chain() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), true);
        map.insert_new(3, "three".to_string(), false);

        let removed = map.remove(&2).unwrap();
        assert!(removed.pinned);
        assert_eq!(map.pinned_len(), 0);
        assert_eq!(unpinned_keys(&map), vec![1, 3]);
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_remove_ptr_for_eviction() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), false);

        let victim = map.lru_ptr();
        let removed = map.remove_ptr(victim).unwrap();
        assert_eq!(removed.key, 1);
        assert_eq!(unpinned_keys(&map), vec![2]);
        assert!(map.remove_ptr(victim).is_none());
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_stale_ptr_is_rejected_after_slot_reuse() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        let stale = map.get_ptr(&1).unwrap();
        map.remove(&1).unwrap();
        map.insert_new(2, "two".to_string(), false);

        // The slot was recycled for key 2, but the old handle's generation
        // no longer matches.
        assert_eq!(map.ptr_get(stale), None);
        assert_eq!(map.ptr_get_entry(stale), None);
        assert_eq!(map.key_for_ptr(stale), None);
        assert!(map.remove_ptr(stale).is_none());

        let fresh = map.get_ptr(&2).unwrap();
        assert_ne!(stale, fresh);
        assert_eq!(map.ptr_get(fresh), Some(&"two".to_string()));
    }

    #[test]
    #[timeout(1000)]
    fn test_clear() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), true);
        let stale = map.get_ptr(&1).unwrap();

        map.clear();

        assert!(map.is_empty());
        assert_eq!(map.unpinned_len(), 0);
        assert_eq!(map.pinned_len(), 0);
        assert_eq!(map.ptr_get(stale), None);
        map.validate();

        map.insert_new(3, "three".to_string(), false);
        assert_eq!(map.len(), 1);
        assert_eq!(map.ptr_get(stale), None);
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_shrink_to_fit_preserves_entries() {
        let mut map = LinkedTable::with_capacity(64);
        for i in 0..8 {
            map.insert_new(i, i.to_string(), i % 3 == 0);
        }
        for i in 0..4 {
            map.remove(&i);
        }

        map.shrink_to_fit();

        for i in 4..8 {
            assert_eq!(map.get(&i), Some(&i.to_string()));
        }
        map.validate();
    }

    #[test]
    #[timeout(1000)]
    fn test_iter_orders_recency_then_pinned() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), true);
        map.insert_new(3, "three".to_string(), false);
        map.insert_new(4, "four".to_string(), true);

        let keys: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 3, 2, 4]);

        let pinned: Vec<_> = map.iter_pinned().map(|(k, _)| *k).collect();
        assert_eq!(pinned, vec![2, 4]);
    }

    #[test]
    #[timeout(1000)]
    fn test_iter_empty() {
        let map: LinkedTable<i32, String> = LinkedTable::default();
        assert_eq!(map.iter().count(), 0);
        assert_eq!(map.iter_pinned().count(), 0);
    }

    #[test]
    #[timeout(1000)]
    fn test_into_iter_orders_recency_then_pinned() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), true);
        map.insert_new(3, "three".to_string(), false);

        let items: Vec<_> = map.into_iter().collect();
        assert_eq!(
            items,
            vec![
                (1, "one".to_string()),
                (3, "three".to_string()),
                (2, "two".to_string()),
            ]
        );
    }

    #[test]
    #[timeout(1000)]
    fn test_into_iter_partial_consumption_drops_rest() {
        let mut map = LinkedTable::default();
        for i in 0..10 {
            map.insert_new(i, i.to_string(), i % 2 == 0);
        }

        let mut iter = map.into_iter();
        assert!(iter.next().is_some());
        assert!(iter.next().is_some());
        drop(iter);
    }

    #[test]
    #[timeout(1000)]
    fn test_debug_output_mentions_chains() {
        let mut map = LinkedTable::default();
        map.insert_new(1, "one".to_string(), false);
        map.insert_new(2, "two".to_string(), true);

        let debug = format!("{map:?}");
        assert!(debug.contains("unpinned"));
        assert!(debug.contains("pinned"));
        assert!(debug.contains("one"));
        assert!(debug.contains("two"));
    }

    #[test]
    #[timeout(1000)]
    fn test_churn_keeps_structure_valid() {
        let mut map = LinkedTable::default();
        for round in 0u32..50 {
            map.insert_new(round, round.to_string(), round % 4 == 0);
            if round % 3 == 0 {
                map.remove(&(round / 2));
            }
            if round % 5 == 0 && !map.lru_ptr().is_null() {
                let ptr = map.lru_ptr();
                map.touch(ptr);
            }
            map.validate();
        }
    }
}
