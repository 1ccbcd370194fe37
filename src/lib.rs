//! A bounded [first-in-first-out queue](https://en.wikipedia.org/wiki/Queue_(abstract_data_type)) that evicts its oldest item instead of rejecting new ones, and a thread-safe wrapper around it.
//!
//! ## Queue Implementations
//!
//! - [`LinkedFifo`], a doubly-linked chain of nodes kept in an arena. It is not synchronised; use it when a single owner drives the queue.
//! - [`BoundedFifoQueue`], a [`LinkedFifo`] behind a mutex. All of its methods take `&self`, so it can be shared between threads (for example in an [`Arc`](std::sync::Arc)).
//!
//! Both types have a maximum capacity that is fixed at creation. Enqueueing into a full queue succeeds, and hands the oldest item back to the caller:
//!
//! ```
//! use bounded_fifo::BoundedFifoQueue;
//!
//! let queue = BoundedFifoQueue::new(3);
//! assert_eq!(queue.enqueue(1), None);
//! assert_eq!(queue.enqueue(2), None);
//! assert_eq!(queue.enqueue(3), None);
//!
//! // The queue is full, so the oldest item is evicted.
//! assert_eq!(queue.enqueue(4), Some(1));
//! assert_eq!(queue.len(), 3);
//!
//! assert_eq!(queue.dequeue(), Some(2));
//! assert_eq!(queue.dequeue(), Some(3));
//! assert_eq!(queue.dequeue(), Some(4));
//! assert_eq!(queue.dequeue(), None);
//! ```
//!
//! Callers that would rather keep the old items can use `try_enqueue`, which reports a [`FullError`] holding the rejected item.
//!
//! ## Iteration
//!
//! Both queues iterate from the oldest item to the newest one. Iterating a [`BoundedFifoQueue`] copies its contents under the lock first (see [`BoundedFifoQueue::iter`]); to walk the items in place, hold the lock via [`BoundedFifoQueue::lock`].
//!
//! ## Features
//!
//! The `dev` feature implements [`Arbitrary`](arbitrary::Arbitrary) for [`LinkedFifo`], for use in fuzz tests.

#[cfg(feature = "dev")]
pub use arbitrary;

mod errors;
pub use errors::FullError;

mod invariant;
pub use invariant::Invariant;

mod linked;
pub use linked::{IntoIter, Iter, IterMut, LinkedFifo};

mod sync;
pub use sync::{BoundedFifoQueue, QueueGuard, Snapshot};

/// A first-in-first-out queue of bounded size which makes room for new items by evicting the oldest ones.
///
/// Unlike a rejecting queue, [`enqueue`](Queue::enqueue) always stores the new item. If that pushes the queue over its [maximum capacity](Queue::max_capacity), the oldest item is removed and returned instead.
pub trait Queue {
    /// The type of items to manage in the queue.
    type Item;

    /// Returns the number of items currently in the queue.
    fn len(&self) -> usize;

    /// Returns whether the queue is empty. Must return `true` if and only if `self.len()` returns `0`.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the maximum number of items that the queue holds after any completed operation.
    fn max_capacity(&self) -> usize;

    /// Enqueues an item.
    ///
    /// If the queue held [`max_capacity`](Queue::max_capacity) items at the time of calling, the oldest item is dequeued and returned. At most one item is evicted per call.
    fn enqueue(&mut self, item: Self::Item) -> Option<Self::Item>;

    /// Dequeues the oldest item.
    ///
    /// Will return `None` if the queue is empty at the time of calling.
    fn dequeue(&mut self) -> Option<Self::Item>;

    /// Dequeues items into the given buffer, oldest first, and returns how many were dequeued.
    ///
    /// Will return `0` if the queue is empty at the time of calling or if the buffer is empty.
    fn bulk_dequeue(&mut self, buffer: &mut [Self::Item]) -> usize;
}
