use core::fmt;
use core::iter::FusedIterator;

use slab::Slab;
use tracing::trace;

use crate::{FullError, Queue};

/// A node of the chain. Links are keys into the arena of the owning [`LinkedFifo`].
struct Node<T> {
    item: T,
    /// The node enqueued directly before this one, towards the tail.
    older: Option<usize>,
    /// The node enqueued directly after this one, towards the head.
    newer: Option<usize>,
}

/// A queue holding up to a fixed number of items, evicting the oldest item when an enqueue would exceed that number.
///
/// Items are stored in a doubly-linked chain whose nodes live in an arena and refer to each other by key. Dequeued nodes give their slot back to the arena, so a queue never holds more than `max_capacity + 1` slots at once.
///
/// This type performs no synchronisation; see [`BoundedFifoQueue`](crate::BoundedFifoQueue) for the thread-safe queue.
pub struct LinkedFifo<T> {
    nodes: Slab<Node<T>>,
    /// Most recently enqueued node.
    head: Option<usize>,
    /// Least recently enqueued node.
    tail: Option<usize>,
    len: usize,
    max_capacity: usize,
}

impl<T> LinkedFifo<T> {
    /// Creates an empty queue that holds at most `max_capacity` items.
    ///
    /// A `max_capacity` of zero is allowed: every enqueued item is handed straight back.
    pub fn new(max_capacity: usize) -> Self {
        LinkedFifo {
            nodes: Slab::new(),
            head: None,
            tail: None,
            len: 0,
            max_capacity,
        }
    }

    /// Creates an empty queue without a practical capacity bound (`max_capacity` is `usize::MAX`).
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Returns the capacity with which this queue was created.
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Returns the number of items currently in the queue.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns whether the next [`enqueue`](LinkedFifo::enqueue) evicts an item.
    pub fn is_full(&self) -> bool {
        self.len >= self.max_capacity
    }

    /// Enqueues an item as the newest one.
    ///
    /// If the queue already held `max_capacity` items, the oldest item is dequeued and returned.
    pub fn enqueue(&mut self, item: T) -> Option<T> {
        self.push_head(item);

        if self.len > self.max_capacity {
            trace!(max_capacity = self.max_capacity, "evicting oldest item");
            self.pop_tail()
        } else {
            None
        }
    }

    /// Enqueues an item unless the queue is full, in which case the item is returned inside the error and the queue is left untouched.
    pub fn try_enqueue(&mut self, item: T) -> Result<(), FullError<T>> {
        if self.is_full() {
            Err(FullError::new(item, self.max_capacity))
        } else {
            self.push_head(item);
            Ok(())
        }
    }

    /// Dequeues the oldest item, or returns `None` if the queue is empty.
    pub fn dequeue(&mut self) -> Option<T> {
        self.pop_tail()
    }

    /// Moves up to `buffer.len()` of the oldest items into `buffer`, oldest first, and returns how many were moved.
    pub fn bulk_dequeue(&mut self, buffer: &mut [T]) -> usize {
        let mut amount = 0;

        for slot in buffer.iter_mut() {
            match self.pop_tail() {
                Some(item) => {
                    *slot = item;
                    amount += 1;
                }
                None => break,
            }
        }

        amount
    }

    /// Returns the item that the next [`dequeue`](LinkedFifo::dequeue) would return.
    pub fn oldest(&self) -> Option<&T> {
        self.tail.map(|key| &self.nodes[key].item)
    }

    /// Returns the most recently enqueued item.
    pub fn newest(&self) -> Option<&T> {
        self.head.map(|key| &self.nodes[key].item)
    }

    /// Drops all items and releases the arena's memory.
    ///
    /// The queue is already empty when the items are dropped, so a panicking `Drop` of an item leaves it consistent.
    pub fn clear(&mut self) {
        let nodes = core::mem::take(&mut self.nodes);
        self.head = None;
        self.tail = None;
        self.len = 0;
        drop(nodes);
    }

    /// Returns an iterator over the items, from the oldest to the newest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            oldest: self.tail,
            newest: self.head,
            remaining: self.len,
        }
    }

    /// Returns an iterator over mutable references to the items, from the oldest to the newest.
    ///
    /// Creating the iterator costs time and memory proportional to the arena's capacity, which is the largest number of items the queue held since it was created or last [cleared](LinkedFifo::clear).
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        // The arena hands out mutable references in key order only, so park
        // them by key and pick them up again in chain order.
        let order: Vec<usize> = self.keys().collect();
        let mut by_key: Vec<Option<&mut T>> = Vec::new();
        by_key.resize_with(self.nodes.capacity(), || None);

        for (key, node) in self.nodes.iter_mut() {
            by_key[key] = Some(&mut node.item);
        }

        let items: Vec<&mut T> = order
            .into_iter()
            .filter_map(|key| by_key[key].take())
            .collect();

        IterMut {
            inner: items.into_iter(),
        }
    }

    /// Keys of the chain, from the oldest node to the newest.
    fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        core::iter::successors(self.tail, move |&key| self.nodes[key].newer).take(self.len)
    }

    fn push_head(&mut self, item: T) {
        let key = self.nodes.insert(Node {
            item,
            older: self.head,
            newer: None,
        });

        match self.head {
            Some(previous_head) => self.nodes[previous_head].newer = Some(key),
            None => self.tail = Some(key),
        }

        self.head = Some(key);
        self.len += 1;
    }

    fn pop_tail(&mut self) -> Option<T> {
        let key = self.tail?;
        let node = self.nodes.remove(key);

        match node.newer {
            Some(newer) => {
                self.nodes[newer].older = None;
                self.tail = Some(newer);
            }
            None => {
                self.head = None;
                self.tail = None;
            }
        }

        self.len -= 1;
        Some(node.item)
    }

    /// Walks the chain from head to tail and panics if any link disagrees with the bookkeeping.
    #[cfg(test)]
    pub(crate) fn check_links(&self) {
        assert_eq!(self.head.is_none(), self.len == 0);
        assert_eq!(self.tail.is_none(), self.len == 0);
        assert_eq!(self.nodes.len(), self.len);
        assert!(self.len <= self.max_capacity);

        let mut visited = 0;
        let mut cursor = self.head;
        let mut last = None;
        while let Some(key) = cursor {
            let node = &self.nodes[key];
            assert_eq!(node.newer, last, "`newer` does not mirror `older`");
            last = Some(key);
            cursor = node.older;
            visited += 1;
        }
        assert_eq!(visited, self.len);
        assert_eq!(last, self.tail);
    }
}

impl<T> Default for LinkedFifo<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T: Clone> Clone for LinkedFifo<T> {
    fn clone(&self) -> Self {
        let mut cloned = LinkedFifo::new(self.max_capacity);
        cloned.extend(self.iter().cloned());
        cloned
    }
}

impl<T: PartialEq> PartialEq for LinkedFifo<T> {
    fn eq(&self, other: &Self) -> bool {
        self.max_capacity == other.max_capacity && self.len == other.len && self.iter().eq(other)
    }
}

impl<T: Eq> Eq for LinkedFifo<T> {}

impl<T> Queue for LinkedFifo<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.len
    }

    fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    fn enqueue(&mut self, item: T) -> Option<T> {
        LinkedFifo::enqueue(self, item)
    }

    fn dequeue(&mut self) -> Option<T> {
        LinkedFifo::dequeue(self)
    }

    fn bulk_dequeue(&mut self, buffer: &mut [T]) -> usize {
        LinkedFifo::bulk_dequeue(self, buffer)
    }
}

impl<T> Extend<T> for LinkedFifo<T> {
    /// Enqueues every item; items evicted along the way are dropped.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            let _ = self.enqueue(item);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedFifo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedFifo")
            .field("max_capacity", &self.max_capacity)
            .field("len", &self.len)
            .field("data", &DataDebugger(self))
            .finish()
    }
}

pub(crate) struct DataDebugger<'q, T>(pub(crate) &'q LinkedFifo<T>);

impl<'q, T: fmt::Debug> fmt::Debug for DataDebugger<'q, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

#[cfg(feature = "dev")]
impl<'a, T: arbitrary::Arbitrary<'a>> arbitrary::Arbitrary<'a> for LinkedFifo<T> {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let max_capacity = u.int_in_range(0..=255usize)?;
        let mut queue = LinkedFifo::new(max_capacity);

        for item in u.arbitrary_iter::<T>()? {
            let _ = queue.enqueue(item?);
        }

        Ok(queue)
    }
}

/// Iterator over the items of a [`LinkedFifo`], from the oldest to the newest. Created by [`LinkedFifo::iter`].
pub struct Iter<'a, T> {
    nodes: &'a Slab<Node<T>>,
    oldest: Option<usize>,
    newest: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }

        let node = &self.nodes[self.oldest?];
        self.oldest = node.newer;
        self.remaining -= 1;
        Some(&node.item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }

        let node = &self.nodes[self.newest?];
        self.newest = node.older;
        self.remaining -= 1;
        Some(&node.item)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter {
            nodes: self.nodes,
            oldest: self.oldest,
            newest: self.newest,
            remaining: self.remaining,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.clone().collect::<Vec<_>>()).finish()
    }
}

/// Iterator over mutable references to the items of a [`LinkedFifo`], from the oldest to the newest. Created by [`LinkedFifo::iter_mut`].
#[derive(Debug)]
pub struct IterMut<'a, T> {
    inner: std::vec::IntoIter<&'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

/// Owning iterator that dequeues the items of a [`LinkedFifo`], oldest first.
#[derive(Debug)]
pub struct IntoIter<T>(LinkedFifo<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.0.dequeue()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.0.len, Some(self.0.len))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> IntoIterator for LinkedFifo<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter(self)
    }
}

impl<'a, T> IntoIterator for &'a LinkedFifo<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut LinkedFifo<T> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}
