use wrapper::Wrapper;

use crate::Queue;

/// A [`Queue`] wrapper that panics when the wrapped queue violates the queue contract.
///
/// Wrap a queue in this type while testing or fuzzing it; every call is forwarded to the inner queue and its result is checked against the queue's length and capacity before and after the call.
///
/// The wrapper needs exclusive access to make its checks meaningful: wrapping a [`BoundedFifoQueue`](crate::BoundedFifoQueue) that other threads still mutate yields spurious panics.
///
/// #### Invariants
///
/// The wrapper enforces the following invariants:
///
/// - `len()` never exceeds `max_capacity()`.
/// - [`enqueue`](Queue::enqueue) returns an item if and only if the queue already held `max_capacity()` items, and then leaves the length unchanged. Otherwise it grows the length by one.
/// - [`dequeue`](Queue::dequeue) returns `None` if and only if the queue was empty, and otherwise shrinks the length by one.
/// - [`bulk_dequeue`](Queue::bulk_dequeue) reports no more items than the buffer holds or the queue contained, returns zero only for an empty queue or an empty buffer, and shrinks the length by the reported amount.
#[derive(Copy, Clone, Hash, Ord, Eq, PartialEq, PartialOrd)]
#[cfg_attr(feature = "dev", derive(arbitrary::Arbitrary))]
pub struct Invariant<Q> {
    /// An implementer of the `Queue` trait.
    inner: Q,
}

impl<Q: core::fmt::Debug> core::fmt::Debug for Invariant<Q> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.inner.fmt(f)
    }
}

impl<Q> Invariant<Q> {
    /// Return a `Queue` that behaves exactly like the wrapped `Queue` `inner`, except that it panics if `inner` breaks the queue contract.
    pub fn new(inner: Q) -> Self {
        Invariant { inner }
    }
}

impl<Q: Queue> Invariant<Q> {
    fn check_len(&self) -> usize {
        let len = self.inner.len();
        let max_capacity = self.inner.max_capacity();

        if len > max_capacity {
            panic!("queue holds {len} items, exceeding its max capacity of {max_capacity}");
        }

        len
    }
}

impl<Q> AsRef<Q> for Invariant<Q> {
    fn as_ref(&self) -> &Q {
        &self.inner
    }
}

impl<Q> AsMut<Q> for Invariant<Q> {
    fn as_mut(&mut self) -> &mut Q {
        &mut self.inner
    }
}

impl<Q> Wrapper<Q> for Invariant<Q> {
    fn into_inner(self) -> Q {
        self.inner
    }
}

impl<Q: Queue> Queue for Invariant<Q> {
    type Item = Q::Item;

    fn len(&self) -> usize {
        self.check_len()
    }

    fn max_capacity(&self) -> usize {
        self.inner.max_capacity()
    }

    fn enqueue(&mut self, item: Self::Item) -> Option<Self::Item> {
        let before = self.check_len();
        let full = before == self.inner.max_capacity();

        let evicted = self.inner.enqueue(item);
        let after = self.check_len();

        match (evicted.is_some(), full) {
            (true, true) if after == before => {}
            (false, false) if after == before + 1 => {}
            (true, false) => panic!("`enqueue` evicted an item from a queue that was not full"),
            (false, true) => panic!("`enqueue` did not evict an item from a full queue"),
            _ => panic!("`enqueue` changed the length from {before} to {after}"),
        }

        evicted
    }

    fn dequeue(&mut self) -> Option<Self::Item> {
        let before = self.check_len();

        let dequeued = self.inner.dequeue();
        let after = self.check_len();

        match &dequeued {
            None if before != 0 => panic!("`dequeue` returned `None` from a non-empty queue"),
            None if after != 0 => panic!("`dequeue` changed the length of an empty queue"),
            Some(_) if before == 0 => panic!("`dequeue` returned an item from an empty queue"),
            Some(_) if after + 1 != before => {
                panic!("`dequeue` changed the length from {before} to {after}")
            }
            _ => {}
        }

        dequeued
    }

    fn bulk_dequeue(&mut self, buffer: &mut [Self::Item]) -> usize {
        let before = self.check_len();

        let amount = self.inner.bulk_dequeue(buffer);
        let after = self.check_len();

        if amount > buffer.len() || amount > before {
            panic!(
                "`bulk_dequeue` reported {amount} items, but the buffer holds {} and the queue held {before}",
                buffer.len()
            );
        } else if amount == 0 && before != 0 && !buffer.is_empty() {
            panic!("`bulk_dequeue` dequeued nothing from a non-empty queue");
        } else if before - amount != after {
            panic!("`bulk_dequeue` reported {amount} items but changed the length from {before} to {after}");
        }

        amount
    }
}
