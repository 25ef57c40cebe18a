//! Comparator-ordered wait queues.
//!
//! Every queue in the sync core (semaphore waiters, a thread's donors,
//! condition waiters) is a [`WaitQueue`]. The queue itself knows nothing
//! about priorities: ordering is supplied per call as a comparator.
//!
//! Ordering contract for `cmp(a, b)`:
//!   - `Less`    — `a` must come before `b`
//!   - `Equal`   — keep arrival order
//!   - `Greater` — `a` must come after `b`
//!
//! Both insertion and sorting are stable, so elements that compare `Equal`
//! stay in the order they were enqueued.

use alloc::collections::VecDeque;
use alloc::collections::vec_deque;
use core::cmp::Ordering;

/// An ordered sequence of waiters.
///
/// `new` does not allocate; storage is reserved when the first waiter is
/// queued.
#[derive(Debug)]
pub struct WaitQueue<T> {
    items: VecDeque<T>,
}

impl<T> WaitQueue<T> {
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Inserts `item` before the first element it orders strictly before.
    ///
    /// Elements comparing `Equal` to `item` stay ahead of it.
    pub fn insert_ordered<F>(&mut self, item: T, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let at = self
            .items
            .iter()
            .position(|queued| cmp(&item, queued) == Ordering::Less)
            .unwrap_or(self.items.len());
        self.items.insert(at, item);
    }

    /// Appends without looking at the order.
    pub fn push_back(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Stable re-sort. Needed whenever the key of a queued element may have
    /// changed since it was inserted.
    pub fn sort<F>(&mut self, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.items.make_contiguous().sort_by(cmp);
    }

    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Removes and returns the first element matching `pred`.
    pub fn remove_first<P>(&mut self, mut pred: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        let at = self.items.iter().position(|item| pred(item))?;
        self.items.remove(at)
    }

    /// Keeps only the elements matching `keep`, preserving order.
    /// Returns how many were removed.
    pub fn retain<P>(&mut self, keep: P) -> usize
    where
        P: FnMut(&T) -> bool,
    {
        let before = self.items.len();
        self.items.retain(keep);
        before - self.items.len()
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for WaitQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a WaitQueue<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    /// (key, arrival) pairs; higher key first.
    fn by_key_desc(a: &(u8, usize), b: &(u8, usize)) -> Ordering {
        b.0.cmp(&a.0)
    }

    fn collect(q: &WaitQueue<(u8, usize)>) -> Vec<(u8, usize)> {
        q.iter().copied().collect()
    }

    #[test]
    fn insert_ordered_keeps_arrival_order_for_ties() {
        let mut q = WaitQueue::new();
        q.insert_ordered((5, 0), by_key_desc);
        q.insert_ordered((1, 1), by_key_desc);
        q.insert_ordered((5, 2), by_key_desc);
        q.insert_ordered((9, 3), by_key_desc);
        q.insert_ordered((1, 4), by_key_desc);
        assert_eq!(collect(&q), [(9, 3), (5, 0), (5, 2), (1, 1), (1, 4)]);
    }

    #[test]
    fn sort_is_stable() {
        let mut q = WaitQueue::new();
        for (i, key) in [3u8, 7, 3, 7, 1].into_iter().enumerate() {
            q.push_back((key, i));
        }
        q.sort(by_key_desc);
        assert_eq!(collect(&q), [(7, 1), (7, 3), (3, 0), (3, 2), (1, 4)]);
    }

    #[test]
    fn retain_and_remove_first_keep_order() {
        let mut q = WaitQueue::new();
        for (i, key) in [4u8, 2, 4, 8].into_iter().enumerate() {
            q.push_back((key, i));
        }
        assert_eq!(q.retain(|&(k, _)| k != 6), 0);
        assert_eq!(q.retain(|&(k, _)| k != 4), 2);
        assert_eq!(collect(&q), [(2, 1), (8, 3)]);
        assert_eq!(q.remove_first(|&(k, _)| k == 8), Some((8, 3)));
        assert_eq!(q.remove_first(|&(k, _)| k == 8), None);
        assert_eq!((&q).into_iter().count(), 1);
    }

    #[test]
    fn pop_front_on_empty_queue() {
        let mut q: WaitQueue<(u8, usize)> = WaitQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.front(), None);
        assert_eq!(q.pop_front(), None);
    }

    proptest! {
        #[test]
        fn ordered_inserts_match_stable_sort(keys in proptest::collection::vec(0u8..8, 0..40)) {
            let mut inserted = WaitQueue::new();
            let mut sorted = WaitQueue::new();
            for (i, key) in keys.iter().copied().enumerate() {
                inserted.insert_ordered((key, i), by_key_desc);
                sorted.push_back((key, i));
            }
            sorted.sort(by_key_desc);
            prop_assert_eq!(collect(&inserted), collect(&sorted));
        }

        #[test]
        fn pop_front_yields_max_key_earliest_arrival(keys in proptest::collection::vec(0u8..8, 1..40)) {
            let mut q = WaitQueue::new();
            for (i, key) in keys.iter().copied().enumerate() {
                q.insert_ordered((key, i), by_key_desc);
            }
            let max = keys.iter().copied().max().unwrap();
            let first = keys.iter().position(|&k| k == max).unwrap();
            prop_assert_eq!(q.pop_front(), Some((max, first)));
        }
    }
}
