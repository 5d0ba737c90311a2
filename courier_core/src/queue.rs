/*!
 * Size-capped, insertion-ordered retention.
 *
 * `BoundedQueue<T>` keeps the most recently appended `capacity` elements in
 * arrival order. Appending to a full queue evicts from the front, oldest
 * first (strict FIFO, never by access).
 *
 * The queue only grows at the back. There is no way to insert in the middle
 * or at the front: `push_front` and `insert` exist solely to report
 * `Error::UnsupportedOperation` to callers ported from list-like APIs.
 *
 * Not thread-safe by itself. Wrap it in a `Mutex` when it is shared.
 */
use std::collections::vec_deque::{self, VecDeque};
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct BoundedQueue<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> BoundedQueue<T> {
    /**
     * Creates an empty queue holding at most `capacity` elements.
     *
     * Fails with `Error::InvalidCapacity` when `capacity` is zero.
     */
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(Error::InvalidCapacity { capacity });
        }

        Ok(Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Oldest retained element.
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Newest retained element.
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.items.iter()
    }

    /**
     * Appends `item` as the newest element.
     *
     * If the queue is full, exactly one element (the oldest) is evicted
     * first and handed back to the caller.
     */
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /**
     * Appends every element of `items`, in order, as one bulk operation.
     *
     * The overflow `len + items.len() - capacity` is evicted from the front
     * in a single contiguous range before anything is appended. If `items`
     * alone exceeds the capacity, the whole queue is cleared and only the
     * last `capacity` of the new elements are kept.
     *
     * The final state equals that of calling `push` for each element.
     * Returns how many elements (old or new) were discarded.
     */
    pub fn push_all<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let incoming: Vec<T> = items.into_iter().collect();
        let overhead = (self.items.len() + incoming.len()).saturating_sub(self.capacity);
        if overhead == 0 {
            self.items.extend(incoming);
            return 0;
        }

        /*
         * Drop as many old elements as the overflow requires. When the
         * overflow is larger than what we hold, the remainder comes off the
         * front of the incoming batch.
         */
        let from_existing = overhead.min(self.items.len());
        self.items.drain(..from_existing);

        let from_incoming = overhead - from_existing;
        self.items.extend(incoming.into_iter().skip(from_incoming));

        overhead
    }

    /**
     * Always fails: prepending would put a new element where eviction
     * expects the oldest one.
     */
    pub fn push_front(&mut self, _item: T) -> Result<()> {
        Err(Error::UnsupportedOperation {
            operation: "push_front",
        })
    }

    /// Always fails, for the same reason as `push_front`.
    pub fn insert(&mut self, _index: usize, _item: T) -> Result<()> {
        Err(Error::UnsupportedOperation { operation: "insert" })
    }
}

impl<T> Extend<T> for BoundedQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.push_all(iter);
    }
}

impl<T> IntoIterator for BoundedQueue<T> {
    type Item = T;
    type IntoIter = vec_deque::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a BoundedQueue<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/**
 * Concatenates every element's `Display` output, oldest first, with no
 * separator. Meant for debugging and for dumping retained log lines that
 * already carry their own line endings.
 */
impl<T: fmt::Display> fmt::Display for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            write!(f, "{item}")?;
        }
        Ok(())
    }
}
