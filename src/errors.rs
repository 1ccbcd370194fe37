use thiserror::Error;

/// Error to indicate that a non-evicting enqueue failed because the queue was at its maximum capacity.
///
/// Holds on to the rejected item, so that the caller can retry or put it elsewhere.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[error("queue is full (max capacity {max_capacity})")]
pub struct FullError<T> {
    item: T,
    max_capacity: usize,
}

impl<T> FullError<T> {
    pub(crate) fn new(item: T, max_capacity: usize) -> Self {
        FullError { item, max_capacity }
    }

    /// Returns the item that could not be enqueued.
    pub fn into_item(self) -> T {
        self.item
    }

    /// Returns a reference to the item that could not be enqueued.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Returns the maximum capacity of the queue that rejected the item.
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }
}
