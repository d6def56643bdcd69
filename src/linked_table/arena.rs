use std::ops::{
    Index,
    IndexMut,
};

/// Stable handle to an arena slot. Carries the generation the slot had when
/// the handle was minted, so a handle kept across a free/reuse of its slot
/// can be told apart from a live one instead of silently aliasing the new
/// occupant.
#[derive(Clone, Copy, PartialEq, Eq)]
#[doc(hidden)]
pub struct Ptr {
    index: u32,
    generation: u32,
}

impl std::fmt::Debug for Ptr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "Ptr(null)")
        } else {
            write!(f, "Ptr({}v{})", self.index, self.generation)
        }
    }
}

impl Default for Ptr {
    fn default() -> Self {
        Ptr::null()
    }
}

impl Ptr {
    pub(crate) fn null() -> Self {
        Ptr {
            index: u32::MAX,
            generation: 0,
        }
    }

    pub(crate) fn is_null(&self) -> bool {
        self.index == u32::MAX
    }

    pub(crate) fn new(index: usize, generation: u32) -> Self {
        debug_assert!(index < u32::MAX as usize, "Index too large to fit in Ptr: {index}");
        Ptr {
            index: index as u32,
            generation,
        }
    }

    pub(crate) fn index(self) -> usize {
        debug_assert!(!self.is_null(), "Attempted to take the index of a null Ptr");
        self.index as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node<K, T> {
    pub(crate) hash: u64,
    pub(crate) pinned: bool,
    pub(crate) key: K,
    pub(crate) value: T,
}

#[derive(Debug, Clone)]
enum SlotState<K, T> {
    Free,
    Occupied(Node<K, T>),
}

#[derive(Debug, Clone)]
pub(crate) struct Slot<K, T> {
    generation: u32,
    pub(crate) prev: Ptr,
    pub(crate) next: Ptr,
    state: SlotState<K, T>,
}

impl<K, T> Slot<K, T> {
    pub(crate) fn into_node(self) -> Node<K, T> {
        match self.state {
            SlotState::Occupied(node) => node,
            SlotState::Free => unreachable!("Attempted to extract the node of a free slot"),
        }
    }

    pub(crate) fn node(&self) -> &Node<K, T> {
        match &self.state {
            SlotState::Occupied(node) => node,
            SlotState::Free => unreachable!("Attempted to access the node of a free slot"),
        }
    }

    fn node_mut(&mut self) -> &mut Node<K, T> {
        match &mut self.state {
            SlotState::Occupied(node) => node,
            SlotState::Free => unreachable!("Attempted to access the node of a free slot"),
        }
    }

    fn is_occupied(&self) -> bool {
        matches!(self.state, SlotState::Occupied(_))
    }
}

/// Slot storage for cache entries. Handles stay valid until their slot is
/// freed; freeing bumps the slot's generation, and the slot is recycled
/// through an intrusive free list threaded over `next`.
///
/// Generations wrap at `u32::MAX`, so staleness detection is best-effort
/// after four billion reuses of a single slot.
#[derive(Debug, Clone)]
pub(crate) struct Arena<K, T> {
    slots: Vec<Slot<K, T>>,
    free_head: Ptr,
}

impl<K, T> Arena<K, T> {
    pub(crate) fn new() -> Self {
        Arena {
            slots: Vec::new(),
            free_head: Ptr::null(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        assert!(capacity < u32::MAX as usize, "Capacity too large");
        let mut slots = Vec::with_capacity(capacity);
        for i in 0..capacity {
            slots.push(Slot {
                generation: 0,
                prev: Ptr::null(),
                next: if i + 1 < capacity {
                    Ptr::new(i + 1, 0)
                } else {
                    Ptr::null()
                },
                state: SlotState::Free,
            });
        }
        Arena {
            slots,
            free_head: if capacity > 0 {
                Ptr::new(0, 0)
            } else {
                Ptr::null()
            },
        }
    }

    pub(crate) fn links(&self, ptr: Ptr) -> &Slot<K, T> {
        debug_assert!(self.is_live(ptr), "Pointer must be live: {ptr:?}");
        &self.slots[ptr.index()]
    }

    pub(crate) fn links_mut(&mut self, ptr: Ptr) -> &mut Slot<K, T> {
        debug_assert!(self.is_live(ptr), "Pointer must be live: {ptr:?}");
        &mut self.slots[ptr.index()]
    }

    pub(crate) fn get(&self, ptr: Ptr) -> Option<&Node<K, T>> {
        if !self.is_live(ptr) {
            return None;
        }
        Some(self.slots[ptr.index()].node())
    }

    pub(crate) fn get_mut(&mut self, ptr: Ptr) -> Option<&mut Node<K, T>> {
        if !self.is_live(ptr) {
            return None;
        }
        Some(self.slots[ptr.index()].node_mut())
    }

    pub(crate) fn is_live(&self, ptr: Ptr) -> bool {
        if ptr.is_null() {
            return false;
        }
        match self.slots.get(ptr.index()) {
            Some(slot) => slot.generation == ptr.generation && slot.is_occupied(),
            None => false,
        }
    }

    #[inline]
    pub(crate) fn alloc(&mut self, key: K, value: T, hash: u64, pinned: bool) -> Ptr {
        let node = Node {
            hash,
            pinned,
            key,
            value,
        };
        if !self.free_head.is_null() {
            let ptr = self.free_head;
            let slot = &mut self.slots[ptr.index()];
            debug_assert!(slot.generation == ptr.generation && !slot.is_occupied());
            self.free_head = slot.next;
            slot.prev = Ptr::null();
            slot.next = Ptr::null();
            slot.state = SlotState::Occupied(node);
            ptr
        } else {
            let ptr = Ptr::new(self.slots.len(), 0);
            self.slots.push(Slot {
                generation: 0,
                prev: Ptr::null(),
                next: Ptr::null(),
                state: SlotState::Occupied(node),
            });
            ptr
        }
    }

    /// Frees the slot and returns it with its links intact. The slot's
    /// generation is bumped first, so `ptr` and any copies of it are stale
    /// from here on.
    #[inline]
    pub(crate) fn free(&mut self, ptr: Ptr) -> Slot<K, T> {
        debug_assert!(self.is_live(ptr), "Pointer to free must be live: {ptr:?}");
        let new_generation = self.slots[ptr.index()].generation.wrapping_add(1);
        let result = std::mem::replace(
            &mut self.slots[ptr.index()],
            Slot {
                generation: new_generation,
                prev: Ptr::null(),
                next: self.free_head,
                state: SlotState::Free,
            },
        );
        assert!(result.is_occupied(), "Attempted to free an unoccupied slot");
        self.free_head = Ptr::new(ptr.index(), new_generation);
        result
    }

    /// Drops every occupied slot in place, bumping its generation, and
    /// rethreads the whole arena as free storage. Keeps allocations.
    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.is_occupied() {
                slot.generation = slot.generation.wrapping_add(1);
                slot.state = SlotState::Free;
            }
            slot.prev = Ptr::null();
            slot.next = Ptr::null();
        }
        self.free_head = Ptr::null();
        for i in (0..self.slots.len()).rev() {
            self.slots[i].next = self.free_head;
            self.free_head = Ptr::new(i, self.slots[i].generation);
        }
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        // Occupied slots cannot be moved to fill free ones: live Ptrs address
        // them by position. This only releases the excess Vec allocation.
        self.slots.shrink_to_fit();
    }

    #[cfg(any(test, all(debug_assertions, feature = "internal-debugging")))]
    pub(crate) fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_occupied()).count()
    }
}

impl<K, T> Index<Ptr> for Arena<K, T> {
    type Output = Node<K, T>;

    fn index(&self, index: Ptr) -> &Self::Output {
        debug_assert!(self.is_live(index), "Pointer must be live: {index:?}");
        self.slots[index.index()].node()
    }
}

impl<K, T> IndexMut<Ptr> for Arena<K, T> {
    fn index_mut(&mut self, index: Ptr) -> &mut Self::Output {
        debug_assert!(self.is_live(index), "Pointer must be live: {index:?}");
        self.slots[index.index()].node_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ptr_null() {
        let null_ptr = Ptr::null();
        assert!(null_ptr.is_null());
        assert!(Ptr::default().is_null());
    }

    #[test]
    fn test_ptr_equality() {
        let ptr1 = Ptr::new(42, 0);
        let ptr2 = Ptr::new(42, 0);
        let ptr3 = Ptr::new(43, 0);
        let ptr4 = Ptr::new(42, 1);

        assert_eq!(ptr1, ptr2);
        assert_ne!(ptr1, ptr3);
        assert_ne!(ptr1, ptr4);
    }

    #[test]
    fn test_ptr_debug() {
        assert_eq!(format!("{:?}", Ptr::null()), "Ptr(null)");
        assert_eq!(format!("{:?}", Ptr::new(42, 0)), "Ptr(42v0)");
        assert_eq!(format!("{:?}", Ptr::new(3, 7)), "Ptr(3v7)");
    }

    #[test]
    fn test_arena_new() {
        let arena: Arena<i32, String> = Arena::new();
        assert_eq!(arena.slots.len(), 0);
        assert!(arena.free_head.is_null());
    }

    #[test]
    fn test_arena_with_capacity() {
        let arena: Arena<i32, String> = Arena::with_capacity(10);
        assert!(arena.slots.capacity() >= 10);
        assert!(!arena.free_head.is_null());
    }

    #[test]
    #[should_panic(expected = "Capacity too large")]
    fn test_arena_with_capacity_too_large() {
        Arena::<i32, String>::with_capacity(usize::MAX);
    }

    #[test]
    fn test_arena_alloc_single() {
        let mut arena = Arena::new();
        let ptr = arena.alloc(42, "hello".to_string(), 12345, false);

        assert!(!ptr.is_null());
        assert!(arena.is_live(ptr));
        assert_eq!(arena.slots.len(), 1);

        let node = &arena[ptr];
        assert_eq!(node.key, 42);
        assert_eq!(node.value, "hello");
        assert_eq!(node.hash, 12345);
        assert!(!node.pinned);
    }

    #[test]
    fn test_arena_alloc_multiple() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, "one".to_string(), 111, false);
        let ptr2 = arena.alloc(2, "two".to_string(), 222, true);
        let ptr3 = arena.alloc(3, "three".to_string(), 333, false);

        assert_ne!(ptr1, ptr2);
        assert_ne!(ptr2, ptr3);
        assert_ne!(ptr1, ptr3);

        assert_eq!(arena[ptr1].key, 1);
        assert_eq!(arena[ptr2].key, 2);
        assert_eq!(arena[ptr3].key, 3);
        assert!(arena[ptr2].pinned);
    }

    #[test]
    fn test_arena_free_and_reuse_bumps_generation() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, "one".to_string(), 111, false);
        let ptr2 = arena.alloc(2, "two".to_string(), 222, false);

        let slot = arena.free(ptr1);
        assert_eq!(slot.node().key, 1);
        assert_eq!(slot.node().value, "one");
        assert!(!arena.is_live(ptr1));
        assert!(arena.is_live(ptr2));

        let ptr3 = arena.alloc(3, "three".to_string(), 333, false);
        assert_eq!(ptr3.index(), ptr1.index());
        assert_ne!(ptr3, ptr1);
        assert!(arena.is_live(ptr3));
        assert_eq!(arena[ptr3].key, 3);
    }

    #[test]
    fn test_arena_stale_ptr_detected() {
        let mut arena = Arena::new();
        let stale = arena.alloc(1, "one".to_string(), 111, false);
        arena.free(stale);
        let fresh = arena.alloc(2, "two".to_string(), 222, false);

        assert!(!arena.is_live(stale));
        assert!(arena.get(stale).is_none());
        assert!(arena.is_live(fresh));
        assert_eq!(arena.get(fresh).map(|node| node.key), Some(2));
    }

    #[test]
    fn test_arena_free_links_returned_intact() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, 10, 111, false);
        let ptr2 = arena.alloc(2, 20, 222, false);
        arena.links_mut(ptr1).next = ptr2;
        arena.links_mut(ptr2).prev = ptr1;

        let slot = arena.free(ptr2);
        assert_eq!(slot.prev, ptr1);
        assert!(slot.next.is_null());
        assert_eq!(slot.into_node().value, 20);
    }

    #[test]
    fn test_arena_index_operations() {
        let mut arena = Arena::new();
        let ptr = arena.alloc(42, "hello".to_string(), 12345, false);

        arena[ptr].value = "world".to_string();
        assert_eq!(arena[ptr].value, "world");

        arena[ptr].pinned = true;
        assert!(arena[ptr].pinned);
    }

    #[test]
    fn test_arena_clear_invalidates_handles() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, "one".to_string(), 111, false);
        let ptr2 = arena.alloc(2, "two".to_string(), 222, true);

        arena.clear();

        assert!(!arena.is_live(ptr1));
        assert!(!arena.is_live(ptr2));
        assert_eq!(arena.occupied_count(), 0);
        assert_eq!(arena.slots.len(), 2);

        let ptr3 = arena.alloc(3, "three".to_string(), 333, false);
        assert!(arena.is_live(ptr3));
        assert!(!arena.is_live(ptr1));
        assert!(!arena.is_live(ptr2));
        assert_eq!(arena.slots.len(), 2);
    }

    #[test]
    fn test_arena_clone() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, "one".to_string(), 111, false);
        let ptr2 = arena.alloc(2, "two".to_string(), 222, true);

        arena.links_mut(ptr1).next = ptr2;
        arena.links_mut(ptr2).prev = ptr1;

        let cloned = arena.clone();

        assert_eq!(cloned.slots.len(), arena.slots.len());
        assert_eq!(cloned[ptr1].key, 1);
        assert_eq!(cloned[ptr2].key, 2);
        assert!(cloned[ptr2].pinned);
        assert_eq!(cloned.links(ptr1).next, ptr2);
        assert_eq!(cloned.links(ptr2).prev, ptr1);
    }

    #[test]
    fn test_arena_clone_with_free_slots() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, "one".to_string(), 111, false);
        let ptr2 = arena.alloc(2, "two".to_string(), 222, false);
        let ptr3 = arena.alloc(3, "three".to_string(), 333, false);

        arena.free(ptr2);

        let cloned = arena.clone();

        assert!(cloned.is_live(ptr1));
        assert!(!cloned.is_live(ptr2));
        assert!(cloned.is_live(ptr3));
        assert_eq!(cloned.free_head, arena.free_head);
    }

    #[test]
    #[should_panic]
    fn test_arena_free_stale_ptr() {
        let mut arena = Arena::new();
        let ptr = arena.alloc(1, "one".to_string(), 111, false);
        arena.free(ptr);
        arena.free(ptr);
    }

    #[test]
    fn test_arena_is_live_null_ptr() {
        let arena: Arena<i32, String> = Arena::new();
        assert!(!arena.is_live(Ptr::null()));
    }

    #[test]
    fn test_arena_reuse_order_is_lifo() {
        let mut arena = Arena::new();
        let ptr1 = arena.alloc(1, 1, 1, false);
        let ptr2 = arena.alloc(2, 2, 2, false);
        arena.free(ptr1);
        arena.free(ptr2);

        let ptr3 = arena.alloc(3, 3, 3, false);
        let ptr4 = arena.alloc(4, 4, 4, false);
        assert_eq!(ptr3.index(), ptr2.index());
        assert_eq!(ptr4.index(), ptr1.index());
        assert_eq!(arena.slots.len(), 2);
    }

    #[test]
    fn test_slot_sizes() {
        use std::mem::size_of;
        assert_eq!(size_of::<Ptr>(), size_of::<u64>());
        // The pinned bool gives every Node a niche, so the free/occupied
        // distinction costs nothing.
        assert_eq!(
            size_of::<SlotState<u64, u64>>(),
            size_of::<Node<u64, u64>>()
        );
    }
}
