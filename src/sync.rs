use core::fmt;
use core::iter::FusedIterator;
use core::ops::Deref;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::linked::DataDebugger;
use crate::{FullError, IterMut, LinkedFifo, Queue};

/// A [`LinkedFifo`] that can be shared between threads.
///
/// Every method takes `&self` and runs under a single mutex which guards the whole chain. An [`enqueue`](BoundedFifoQueue::enqueue) that has to evict does so within the same critical section, so no other thread ever observes the queue above its capacity.
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
///
/// use bounded_fifo::BoundedFifoQueue;
///
/// let queue = Arc::new(BoundedFifoQueue::unbounded());
///
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let queue = Arc::clone(&queue);
///         thread::spawn(move || {
///             for i in 0..100 {
///                 let _ = queue.enqueue(t * 100 + i);
///             }
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
///
/// assert_eq!(queue.len(), 400);
/// ```
///
/// A thread that panics while holding the lock does not render the queue unusable: the next caller takes over the (still consistent) chain.
pub struct BoundedFifoQueue<T> {
    max_capacity: usize,
    inner: Mutex<LinkedFifo<T>>,
}

impl<T> BoundedFifoQueue<T> {
    /// Creates an empty queue that holds at most `max_capacity` items.
    pub fn new(max_capacity: usize) -> Self {
        LinkedFifo::new(max_capacity).into()
    }

    /// Creates an empty queue without a practical capacity bound (`max_capacity` is `usize::MAX`).
    pub fn unbounded() -> Self {
        LinkedFifo::unbounded().into()
    }

    /// Returns the capacity with which this queue was created. Does not lock.
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Returns the number of items in the queue at the time of calling.
    pub fn len(&self) -> usize {
        self.locked().len()
    }

    /// Returns whether the queue was empty at the time of calling.
    pub fn is_empty(&self) -> bool {
        self.locked().is_empty()
    }

    /// Enqueues an item as the newest one.
    ///
    /// If the queue already held `max_capacity` items, the oldest item is dequeued and returned.
    pub fn enqueue(&self, item: T) -> Option<T> {
        self.locked().enqueue(item)
    }

    /// Enqueues an item unless the queue is full, in which case the item is returned inside the error.
    pub fn try_enqueue(&self, item: T) -> Result<(), FullError<T>> {
        self.locked().try_enqueue(item)
    }

    /// Dequeues the oldest item, or returns `None` if the queue is empty.
    pub fn dequeue(&self) -> Option<T> {
        self.locked().dequeue()
    }

    /// Moves up to `buffer.len()` of the oldest items into `buffer` under a single lock acquisition, and returns how many were moved.
    pub fn bulk_dequeue(&self, buffer: &mut [T]) -> usize {
        self.locked().bulk_dequeue(buffer)
    }

    /// Drops all items.
    pub fn clear(&self) {
        self.locked().clear();
    }

    /// Removes all items, returning them oldest first.
    pub fn drain(&self) -> Vec<T> {
        let taken = core::mem::replace(&mut *self.locked(), LinkedFifo::new(self.max_capacity));
        taken.into_iter().collect()
    }

    /// Acquires the lock and returns a guard through which several operations run without interference from other threads.
    ///
    /// The guard offers the mutating operations of the underlying [`LinkedFifo`], including in-place iteration, and dereferences to it for everything else:
    ///
    /// ```
    /// use bounded_fifo::BoundedFifoQueue;
    ///
    /// let queue = BoundedFifoQueue::new(4);
    /// let _ = queue.enqueue(1);
    /// let _ = queue.enqueue(2);
    ///
    /// for item in queue.lock().iter_mut() {
    ///     *item *= 10;
    /// }
    ///
    /// assert_eq!(queue.dequeue(), Some(10));
    /// ```
    ///
    /// Calling other methods of this queue from the same thread while the guard is alive deadlocks or panics.
    pub fn lock(&self) -> QueueGuard<'_, T> {
        QueueGuard(self.locked())
    }

    /// The underlying queue without locking, which the exclusive borrow makes safe.
    fn exclusive(&mut self) -> &mut LinkedFifo<T> {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Consumes the queue and returns the underlying [`LinkedFifo`].
    pub fn into_inner(self) -> LinkedFifo<T> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn locked(&self) -> MutexGuard<'_, LinkedFifo<T>> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("recovering queue after a thread panicked while holding its lock");
            self.inner.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl<T: Clone> BoundedFifoQueue<T> {
    /// Copies the items, oldest first, under the lock.
    pub fn snapshot(&self) -> Vec<T> {
        self.locked().iter().cloned().collect()
    }

    /// Returns an iterator over a copy of the items, from the oldest to the newest.
    ///
    /// The items are copied eagerly under the lock, so the iterator is unaffected by anything other threads do to the queue afterwards. Every call takes a fresh snapshot. To iterate without copying, use [`lock`](BoundedFifoQueue::lock).
    pub fn iter(&self) -> Snapshot<T> {
        Snapshot(self.snapshot().into_iter())
    }
}

impl<T> Default for BoundedFifoQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> From<LinkedFifo<T>> for BoundedFifoQueue<T> {
    fn from(queue: LinkedFifo<T>) -> Self {
        BoundedFifoQueue {
            max_capacity: queue.max_capacity(),
            inner: Mutex::new(queue),
        }
    }
}

impl<T> Queue for BoundedFifoQueue<T> {
    type Item = T;

    fn len(&self) -> usize {
        BoundedFifoQueue::len(self)
    }

    fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    fn enqueue(&mut self, item: T) -> Option<T> {
        self.exclusive().enqueue(item)
    }

    fn dequeue(&mut self) -> Option<T> {
        self.exclusive().dequeue()
    }

    fn bulk_dequeue(&mut self, buffer: &mut [T]) -> usize {
        self.exclusive().bulk_dequeue(buffer)
    }
}

impl<'a, T: Clone> IntoIterator for &'a BoundedFifoQueue<T> {
    type Item = T;
    type IntoIter = Snapshot<T>;

    fn into_iter(self) -> Snapshot<T> {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for BoundedFifoQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.locked();

        f.debug_struct("BoundedFifoQueue")
            .field("max_capacity", &self.max_capacity)
            .field("len", &queue.len())
            .field("data", &DataDebugger(&*queue))
            .finish()
    }
}

/// Exclusive access to the [`LinkedFifo`] inside a [`BoundedFifoQueue`]. The lock is released when the guard is dropped.
///
/// The guard never hands out the queue itself mutably, so the capacity stays the one the [`BoundedFifoQueue`] was created with:
///
/// ```compile_fail
/// use bounded_fifo::{BoundedFifoQueue, LinkedFifo};
///
/// let queue: BoundedFifoQueue<u8> = BoundedFifoQueue::new(2);
/// *queue.lock() = LinkedFifo::new(1000);
/// ```
pub struct QueueGuard<'a, T>(MutexGuard<'a, LinkedFifo<T>>);

impl<T> QueueGuard<'_, T> {
    /// See [`LinkedFifo::enqueue`].
    pub fn enqueue(&mut self, item: T) -> Option<T> {
        self.0.enqueue(item)
    }

    /// See [`LinkedFifo::try_enqueue`].
    pub fn try_enqueue(&mut self, item: T) -> Result<(), FullError<T>> {
        self.0.try_enqueue(item)
    }

    /// See [`LinkedFifo::dequeue`].
    pub fn dequeue(&mut self) -> Option<T> {
        self.0.dequeue()
    }

    /// See [`LinkedFifo::bulk_dequeue`].
    pub fn bulk_dequeue(&mut self, buffer: &mut [T]) -> usize {
        self.0.bulk_dequeue(buffer)
    }

    /// See [`LinkedFifo::clear`].
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// See [`LinkedFifo::iter_mut`].
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        self.0.iter_mut()
    }
}

impl<T> Deref for QueueGuard<'_, T> {
    type Target = LinkedFifo<T>;

    fn deref(&self) -> &LinkedFifo<T> {
        &self.0
    }
}

impl<T> Extend<T> for QueueGuard<'_, T> {
    /// Enqueues every item; items evicted along the way are dropped.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<T: fmt::Debug> fmt::Debug for QueueGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Iterator over a copy of the items of a [`BoundedFifoQueue`], from the oldest to the newest. Created by [`BoundedFifoQueue::iter`].
#[derive(Clone, Debug)]
pub struct Snapshot<T>(std::vec::IntoIter<T>);

impl<T> Iterator for Snapshot<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<T> DoubleEndedIterator for Snapshot<T> {
    fn next_back(&mut self) -> Option<T> {
        self.0.next_back()
    }
}

impl<T> ExactSizeIterator for Snapshot<T> {}

impl<T> FusedIterator for Snapshot<T> {}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::Arc;
    use std::thread;

    use wrapper::Wrapper;

    use super::*;
    use crate::Invariant;

    #[test]
    fn enqueues_and_dequeues_with_correct_amount() {
        let queue = BoundedFifoQueue::new(10);

        assert_eq!(queue.enqueue(1), None);
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn returns_oldest_item_on_enqueue_when_queue_is_full() {
        let queue = BoundedFifoQueue::new(3);

        assert_eq!(queue.enqueue(1), None);
        assert_eq!(queue.enqueue(2), None);
        assert_eq!(queue.enqueue(3), None);
        assert_eq!(queue.enqueue(4), Some(1));
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), Some(3));
        assert_eq!(queue.dequeue(), Some(4));
    }

    #[test]
    fn counts_across_mixed_enqueues_and_dequeues() {
        let queue = BoundedFifoQueue::unbounded();

        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.enqueue(1), None);
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.enqueue(1), None);
        assert_eq!(queue.enqueue(2), None);
        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.enqueue(1), None);

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.max_capacity(), usize::MAX);
    }

    #[test]
    fn counts_exactly_under_contention() {
        let queue = BoundedFifoQueue::unbounded();

        thread::scope(|s| {
            for value in [1, 2] {
                let queue = &queue;
                s.spawn(move || {
                    for _ in 0..10_000 {
                        assert_eq!(queue.enqueue(value), None);
                    }
                });
            }
        });

        assert_eq!(queue.len(), 20_000);

        let items = queue.drain();
        assert_eq!(items.iter().filter(|&&item| item == 1).count(), 10_000);
        assert_eq!(items.iter().filter(|&&item| item == 2).count(), 10_000);
        queue.into_inner().check_links();
    }

    #[test]
    fn evicts_exactly_under_contention() {
        let queue = BoundedFifoQueue::new(100);

        let evicted: usize = thread::scope(|s| {
            let handles: Vec<_> = [1, 2]
                .into_iter()
                .map(|value| {
                    let queue = &queue;
                    s.spawn(move || {
                        (0..10_000)
                            .filter(|_| queue.enqueue(value).is_some())
                            .count()
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .sum()
        });

        assert_eq!(queue.len(), 100);
        assert_eq!(evicted, 19_900);
        queue.into_inner().check_links();
    }

    #[test]
    fn concurrent_producers_and_consumers_lose_nothing() {
        let queue = Arc::new(BoundedFifoQueue::unbounded());

        let producers: Vec<_> = (0..4u64)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..2_500 {
                        let _ = queue.enqueue(t * 10_000 + i);
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    for _ in 0..5_000 {
                        if let Some(item) = queue.dequeue() {
                            taken.push(item);
                        }
                    }
                    taken
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }

        let mut seen: Vec<u64> = consumers
            .into_iter()
            .flat_map(|consumer| consumer.join().unwrap())
            .collect();
        seen.extend(queue.drain());
        seen.sort_unstable();

        let mut expected: Vec<u64> = (0..4u64)
            .flat_map(|t| (0..2_500).map(move |i| t * 10_000 + i))
            .collect();
        expected.sort_unstable();

        assert_eq!(seen, expected);
        assert!(queue.is_empty());
    }

    #[test]
    fn items_from_one_producer_keep_their_order() {
        let queue = BoundedFifoQueue::unbounded();

        thread::scope(|s| {
            for t in 0..2u32 {
                let queue = &queue;
                s.spawn(move || {
                    for i in 0..1_000 {
                        let _ = queue.enqueue((t, i));
                    }
                });
            }
        });

        for t in 0..2u32 {
            let order: Vec<u32> = queue
                .iter()
                .filter(|(producer, _)| *producer == t)
                .map(|(_, i)| i)
                .collect();
            assert_eq!(order, (0..1_000).collect::<Vec<_>>());
        }
    }

    #[test]
    fn iterates_over_a_snapshot_from_oldest_to_newest() {
        let queue = BoundedFifoQueue::new(3);
        for i in 1..=4 {
            let _ = queue.enqueue(i);
        }

        let mut snapshot = queue.iter();

        // Later mutation does not reach an existing snapshot.
        assert_eq!(queue.dequeue(), Some(2));
        let _ = queue.enqueue(5);

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.next(), Some(2));
        assert_eq!(snapshot.next_back(), Some(4));
        assert_eq!(snapshot.next(), Some(3));
        assert_eq!(snapshot.next(), None);

        // Each traversal starts afresh.
        assert_eq!((&queue).into_iter().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(queue.snapshot(), vec![3, 4, 5]);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn updates_through_the_guard_are_seen_by_dequeue() {
        let queue = BoundedFifoQueue::new(10);
        for _ in 0..10 {
            let _ = queue.enqueue(1);
        }

        {
            let mut guard = queue.lock();
            for item in guard.iter_mut() {
                *item += 1;
            }
            assert_eq!(guard.len(), 10);
        }

        for _ in 0..10 {
            assert_eq!(queue.dequeue(), Some(2));
        }
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn try_enqueue_rejects_when_full() {
        let queue = BoundedFifoQueue::new(1);

        assert_eq!(queue.try_enqueue('a'), Ok(()));
        let err = queue.try_enqueue('b').unwrap_err();
        assert_eq!(*err.item(), 'b');
        assert_eq!(queue.snapshot(), vec!['a']);
    }

    #[test]
    fn zero_capacity_is_a_sink() {
        let queue = BoundedFifoQueue::new(0);

        assert_eq!(queue.enqueue(1), Some(1));
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.dequeue(), None);
        assert!(queue.try_enqueue(2).is_err());
    }

    #[test]
    fn bulk_dequeues_and_clears() {
        let queue = BoundedFifoQueue::new(8);
        for i in 0..6 {
            let _ = queue.enqueue(i);
        }

        let mut buf = [0; 4];
        assert_eq!(queue.bulk_dequeue(&mut buf), 4);
        assert_eq!(buf, [0, 1, 2, 3]);

        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.bulk_dequeue(&mut buf), 0);
    }

    #[test]
    fn drain_keeps_the_capacity() {
        let queue = BoundedFifoQueue::new(2);
        queue.lock().extend([1, 2, 3]);

        assert_eq!(queue.drain(), vec![2, 3]);
        assert!(queue.is_empty());
        assert_eq!(queue.lock().max_capacity(), 2);
    }

    #[test]
    fn recovers_from_a_poisoned_lock() {
        let queue = BoundedFifoQueue::new(4);
        let _ = queue.enqueue(1);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut guard = queue.lock();
            let _ = guard.enqueue(2);
            panic!("holding the lock");
        }));
        assert!(result.is_err());

        assert_eq!(queue.enqueue(3), None);
        assert_eq!(queue.snapshot(), vec![1, 2, 3]);
        queue.into_inner().check_links();
    }

    /// Panics when dropped, if armed.
    struct Loaded(bool);

    impl Drop for Loaded {
        fn drop(&mut self) {
            if self.0 && !thread::panicking() {
                panic!("dropped a loaded item");
            }
        }
    }

    #[test]
    fn recovers_after_clear_panics_on_drop() {
        let queue = BoundedFifoQueue::new(4);
        let _ = queue.enqueue(Loaded(true));
        let _ = queue.enqueue(Loaded(false));

        let result = panic::catch_unwind(AssertUnwindSafe(|| queue.clear()));
        assert!(result.is_err());

        assert!(queue.dequeue().is_none());
        assert_eq!(queue.len(), 0);
        assert!(queue.enqueue(Loaded(false)).is_none());
        assert_eq!(queue.len(), 1);
        queue.into_inner().check_links();
    }

    #[test]
    fn guard_operations_keep_the_capacity() {
        let queue = BoundedFifoQueue::new(2);

        {
            let mut guard = queue.lock();
            guard.extend(0..10);
            assert_eq!(guard.enqueue(10), Some(8));
            assert_eq!(guard.try_enqueue(11).map_err(FullError::into_item), Err(11));
            assert_eq!(guard.dequeue(), Some(9));

            let mut buf = [0; 4];
            assert_eq!(guard.bulk_dequeue(&mut buf), 1);
            assert_eq!(buf[0], 10);

            let _ = guard.enqueue(12);
            guard.clear();
            assert!(guard.is_empty());
        }

        for i in 0..10 {
            let _ = queue.enqueue(i);
            assert!(queue.len() <= queue.max_capacity());
        }
        assert_eq!(queue.max_capacity(), 2);
        assert_eq!(queue.lock().max_capacity(), 2);
        assert_eq!(queue.drain(), vec![8, 9]);
        assert_eq!(queue.lock().max_capacity(), 2);
    }

    #[test]
    fn satisfies_the_queue_contract_when_owned() {
        let mut queue = Invariant::new(BoundedFifoQueue::new(2));

        assert_eq!(queue.enqueue(1), None);
        assert_eq!(queue.enqueue(2), None);
        assert_eq!(queue.enqueue(3), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), Some(3));
        assert_eq!(queue.dequeue(), None);

        let queue = queue.into_inner();
        assert_eq!(Queue::max_capacity(&queue), 2);
    }

    #[test]
    fn test_debug_impl() {
        let queue = BoundedFifoQueue::new(4);

        assert_eq!(queue.enqueue(7), None);
        assert_eq!(queue.enqueue(21), None);
        assert_eq!(
            format!("{:?}", queue),
            "BoundedFifoQueue { max_capacity: 4, len: 2, data: [7, 21] }"
        );
    }
}
