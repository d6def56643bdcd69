#![no_main]

use std::num::NonZeroUsize;

use libfuzzer_sys::fuzz_target;
use pincache::PinnedLru;

#[derive(Debug)]
enum CacheOperation {
    Insert(u16, u16),
    InsertPinned(u16, u16),
    Get(u16),
    GetMut(u16, u16),
    Peek(u16),
    PeekMut(u16, u16),
    Pin(u16),
    Unpin(u16),
    Remove(u16),
    PopLru,
    GetOrInsertWith(u16, u16),
    Clear,
    Retain,
    Iter,
}

impl<'a> arbitrary::Arbitrary<'a> for CacheOperation {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        match u.int_in_range(0..=13)? {
            0 => Ok(CacheOperation::Insert(u.arbitrary()?, u.arbitrary()?)),
            1 => Ok(CacheOperation::InsertPinned(u.arbitrary()?, u.arbitrary()?)),
            2 => Ok(CacheOperation::Get(u.arbitrary()?)),
            3 => Ok(CacheOperation::GetMut(u.arbitrary()?, u.arbitrary()?)),
            4 => Ok(CacheOperation::Peek(u.arbitrary()?)),
            5 => Ok(CacheOperation::PeekMut(u.arbitrary()?, u.arbitrary()?)),
            6 => Ok(CacheOperation::Pin(u.arbitrary()?)),
            7 => Ok(CacheOperation::Unpin(u.arbitrary()?)),
            8 => Ok(CacheOperation::Remove(u.arbitrary()?)),
            9 => Ok(CacheOperation::PopLru),
            10 => Ok(CacheOperation::GetOrInsertWith(
                u.arbitrary()?,
                u.arbitrary()?,
            )),
            11 => Ok(CacheOperation::Clear),
            12 => Ok(CacheOperation::Retain),
            13 => Ok(CacheOperation::Iter),
            _ => unreachable!(),
        }
    }
}

fuzz_target!(|data: (u16, Vec<CacheOperation>)| {
    let (capacity_raw, operations) = data;

    let capacity = NonZeroUsize::new((capacity_raw % 4).max(1) as usize).unwrap();
    let mut cache = PinnedLru::<u16, u16>::new(capacity);

    let initial_capacity = cache.capacity();

    for op in operations {
        assert!(
            cache.unpinned_len() <= cache.capacity(),
            "Unpinned population exceeded capacity: {cache:#?}",
        );
        assert_eq!(
            cache.len(),
            cache.unpinned_len() + cache.pinned_len(),
            "Length does not partition into pinned and unpinned: {cache:#?}",
        );
        assert_eq!(
            cache.capacity(),
            initial_capacity,
            "Cache capacity altered: {cache:#?}",
        );
        assert_eq!(cache.is_empty(), cache.len() == 0);
        cache.debug_validate();

        match op {
            CacheOperation::Insert(key, value) => {
                let len_before = cache.len();
                let unpinned_before = cache.unpinned_len();
                let pinned_before = cache.pinned_len();
                let contained_before = cache.contains_key(&key);
                let was_pinned = cache.is_pinned(&key) == Some(true);

                cache.insert(key, value);

                assert!(
                    cache.contains_key(&key),
                    "Cache does not contain key after insert: {key} {cache:#?}",
                );
                assert_eq!(
                    cache.peek(&key),
                    Some(&value),
                    "Insert did not store the value: {key} {value} {cache:#?}",
                );
                assert_eq!(
                    cache.is_pinned(&key),
                    Some(false),
                    "Insert left the key pinned: {key} {cache:#?}",
                );

                if was_pinned {
                    assert_eq!(cache.pinned_len(), pinned_before - 1);
                } else if contained_before {
                    assert_eq!(cache.len(), len_before);
                } else if unpinned_before < cache.capacity() {
                    assert_eq!(cache.len(), len_before + 1);
                }
            }

            CacheOperation::InsertPinned(key, value) => {
                let len_before = cache.len();
                let pinned_before = cache.pinned_len();
                let contained_before = cache.contains_key(&key);
                let was_pinned = cache.is_pinned(&key) == Some(true);

                cache.insert_pinned(key, value);

                assert_eq!(
                    cache.is_pinned(&key),
                    Some(true),
                    "Pinned insert left the key unpinned: {key} {cache:#?}",
                );
                assert_eq!(
                    cache.peek(&key),
                    Some(&value),
                    "Pinned insert did not store the value: {key} {value} {cache:#?}",
                );

                // Pinned inserts never displace anything.
                if contained_before {
                    assert_eq!(cache.len(), len_before);
                } else {
                    assert_eq!(cache.len(), len_before + 1);
                }
                if was_pinned {
                    assert_eq!(cache.pinned_len(), pinned_before);
                } else {
                    assert_eq!(cache.pinned_len(), pinned_before + 1);
                }
            }

            CacheOperation::Get(key) => {
                let len_before = cache.len();
                let contains_before = cache.contains_key(&key);
                let pin_before = cache.is_pinned(&key);
                let lru_before = cache.peek_lru().map(|(k, v)| (*k, *v));

                let result = cache.get(&key).copied();

                assert_eq!(
                    result.is_some(),
                    contains_before,
                    "Get result disagrees with contains_key: {key} {cache:#?}",
                );
                assert_eq!(cache.len(), len_before);
                assert_eq!(
                    cache.is_pinned(&key),
                    pin_before,
                    "Get altered the pin state: {key} {cache:#?}",
                );
                if pin_before != Some(false) {
                    assert_eq!(
                        cache.peek_lru().map(|(k, v)| (*k, *v)),
                        lru_before,
                        "Get without an unpinned hit moved the eviction candidate: {key} {cache:#?}",
                    );
                }
            }

            CacheOperation::GetMut(key, value) => {
                let contains_before = cache.contains_key(&key);

                if let Some(stored) = cache.get_mut(&key) {
                    *stored = value;
                }

                assert_eq!(cache.contains_key(&key), contains_before);
                if contains_before {
                    assert_eq!(
                        cache.peek(&key),
                        Some(&value),
                        "Write through get_mut was lost: {key} {value} {cache:#?}",
                    );
                }
            }

            CacheOperation::Peek(key) => {
                let order_before = cache.iter().map(|(k, _)| *k).collect::<Vec<_>>();
                let contains_before = cache.contains_key(&key);

                let result = cache.peek(&key).copied();

                let order_after = cache.iter().map(|(k, _)| *k).collect::<Vec<_>>();
                assert_eq!(
                    result.is_some(),
                    contains_before,
                    "Peek result disagrees with contains_key: {key} {cache:#?}",
                );
                assert_eq!(
                    order_before, order_after,
                    "Peek altered the iteration order: {key} {cache:#?}",
                );
            }

            CacheOperation::PeekMut(key, value) => {
                let contains_before = cache.contains_key(&key);
                let pin_before = cache.is_pinned(&key);

                match cache.peek_mut(&key) {
                    Some(mut entry) => {
                        assert!(contains_before);
                        assert_eq!(entry.key(), &key);
                        assert_eq!(pin_before, Some(entry.is_pinned()));
                        *entry = value;
                    }
                    None => assert!(!contains_before),
                }

                if contains_before {
                    assert_eq!(
                        cache.peek(&key),
                        Some(&value),
                        "Write through the entry was lost: {key} {value} {cache:#?}",
                    );
                    assert_eq!(
                        cache.is_pinned(&key),
                        pin_before,
                        "Entry write altered the pin state: {key} {cache:#?}",
                    );
                    if pin_before == Some(false) {
                        let mru = cache
                            .iter()
                            .take(cache.unpinned_len())
                            .last()
                            .map(|(k, _)| *k);
                        assert_eq!(
                            mru,
                            Some(key),
                            "Entry write did not promote the key: {key} {cache:#?}",
                        );
                    }
                }
            }

            CacheOperation::Pin(key) => {
                let len_before = cache.len();
                let pinned_before = cache.pinned_len();
                let contains_before = cache.contains_key(&key);
                let was_pinned = cache.is_pinned(&key) == Some(true);

                let result = cache.pin(&key);

                assert_eq!(
                    result, contains_before,
                    "Pin result disagrees with contains_key: {key} {cache:#?}",
                );
                assert_eq!(cache.len(), len_before);
                if contains_before {
                    assert_eq!(cache.is_pinned(&key), Some(true));
                }
                if contains_before && !was_pinned {
                    assert_eq!(cache.pinned_len(), pinned_before + 1);
                } else {
                    assert_eq!(cache.pinned_len(), pinned_before);
                }
            }

            CacheOperation::Unpin(key) => {
                let unpinned_before = cache.unpinned_len();
                let contains_before = cache.contains_key(&key);
                let was_pinned = cache.is_pinned(&key) == Some(true);

                let result = cache.unpin(&key);

                assert_eq!(
                    result, contains_before,
                    "Unpin result disagrees with contains_key: {key} {cache:#?}",
                );
                if contains_before {
                    assert_eq!(cache.is_pinned(&key), Some(false));
                }
                if was_pinned {
                    // The entry rejoins the recency order at the used end.
                    let mru = cache
                        .iter()
                        .take(cache.unpinned_len())
                        .last()
                        .map(|(k, _)| *k);
                    assert_eq!(
                        mru,
                        Some(key),
                        "Unpinned key did not become most recently used: {key} {cache:#?}",
                    );
                    if unpinned_before < cache.capacity() {
                        assert_eq!(cache.unpinned_len(), unpinned_before + 1);
                    } else {
                        assert_eq!(cache.unpinned_len(), cache.capacity());
                    }
                }
            }

            CacheOperation::Remove(key) => {
                let len_before = cache.len();
                let contains_before = cache.contains_key(&key);

                let result = cache.remove(&key);

                assert_eq!(
                    result.is_some(),
                    contains_before,
                    "Remove result disagrees with contains_key: {key} {cache:#?}",
                );
                assert!(
                    !cache.contains_key(&key),
                    "Cache still contains key after remove: {key} {cache:#?}",
                );
                if contains_before {
                    assert_eq!(cache.len(), len_before - 1);
                } else {
                    assert_eq!(cache.len(), len_before);
                }
            }

            CacheOperation::PopLru => {
                let len_before = cache.len();
                let expected = cache.peek_lru().map(|(k, v)| (*k, *v));

                let popped = cache.pop_lru();

                assert_eq!(
                    popped, expected,
                    "Pop did not take the eviction candidate: {cache:#?}",
                );
                if let Some((key, _)) = popped {
                    assert!(!cache.contains_key(&key));
                    assert_eq!(cache.len(), len_before - 1);
                } else {
                    assert_eq!(
                        cache.unpinned_len(),
                        0,
                        "Pop returned nothing with unpinned entries present: {cache:#?}",
                    );
                }
            }

            CacheOperation::GetOrInsertWith(key, value) => {
                let contains_before = cache.contains_key(&key);
                let value_before = cache.peek(&key).copied();

                let result = *cache.get_or_insert_with(key, |_| value);

                assert!(cache.contains_key(&key));
                if contains_before {
                    assert_eq!(
                        Some(result),
                        value_before,
                        "Existing value was replaced: {key} {cache:#?}",
                    );
                } else {
                    assert_eq!(result, value);
                    assert_eq!(cache.is_pinned(&key), Some(false));
                }
            }

            CacheOperation::Clear => {
                cache.clear();

                assert_eq!(cache.len(), 0);
                assert!(cache.is_empty());
                assert_eq!(cache.pinned_len(), 0);
                assert_eq!(cache.peek_lru(), None);
                assert_eq!(cache.capacity(), initial_capacity);
            }

            CacheOperation::Retain => {
                let expected = cache
                    .iter()
                    .filter(|(_, v)| **v % 2 == 0)
                    .map(|(k, v)| (*k, *v))
                    .collect::<Vec<_>>();

                cache.retain(|_, v| *v % 2 == 0);

                let after = cache.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>();
                assert_eq!(
                    after, expected,
                    "Retain changed the surviving order: {cache:#?}",
                );
            }

            CacheOperation::Iter => {
                let items = cache.iter().map(|(k, v)| (*k, *v)).collect::<Vec<_>>();
                let unpinned = cache.unpinned_len();

                assert_eq!(items.len(), cache.len());
                for (key, value) in &items[..unpinned] {
                    assert_eq!(cache.is_pinned(key), Some(false));
                    assert_eq!(cache.peek(key), Some(value));
                }
                for (key, value) in &items[unpinned..] {
                    assert_eq!(cache.is_pinned(key), Some(true));
                    assert_eq!(cache.peek(key), Some(value));
                }

                let pinned_items = cache
                    .iter_pinned()
                    .map(|(k, v)| (*k, *v))
                    .collect::<Vec<_>>();
                assert_eq!(pinned_items, items[unpinned..].to_vec());

                // Draining the recency order yields the unpinned prefix in order.
                let mut popped = Vec::new();
                while let Some(entry) = cache.pop_lru() {
                    popped.push(entry);
                }
                assert_eq!(popped, items[..unpinned].to_vec());
            }
        }

        assert!(cache.unpinned_len() <= cache.capacity());
        assert_eq!(cache.len(), cache.unpinned_len() + cache.pinned_len());
        assert_eq!(cache.capacity(), initial_capacity);
        assert_eq!(cache.is_empty(), cache.len() == 0);
    }

    cache.debug_validate();
});
