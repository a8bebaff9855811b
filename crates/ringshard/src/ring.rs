use crate::invariants::{debug_assert_bounded_count, debug_assert_index_consistent};

// =============================================================================
// STORAGE & INDEXING
// =============================================================================
//
// Slots live in a boxed slice allocated once at construction. `head` is the
// next slot to read, `tail` the next slot to write; both are plain indices in
// `[0, capacity)` that wrap with modulo arithmetic (capacity need not be a
// power of two). `len` disambiguates full from empty when `head == tail`.
//
// The ring itself has no lock and takes `&mut self` for mutation. Mutual
// exclusion is provided by the owning `Shard`, which keeps the ring and its
// counters behind one mutex so that "check target, push, bump counter" is a
// single critical section.
//
// Slots hold `Option<T>`: a popped slot is `None`, so dropping the ring drops
// exactly the items still queued and no slot is ever read uninitialized.
//
// =============================================================================

/// Fixed-capacity circular queue.
pub struct RingBuffer<T> {
    slots: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty ring with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be positive");

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            slots: slots.into_boxed_slice(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Returns the ring buffer capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the current number of items in the ring.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the ring is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the ring is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Index of the next slot to read.
    #[inline]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Index of the next slot to write.
    #[inline]
    pub fn tail(&self) -> usize {
        self.tail
    }

    // ---------------------------------------------------------------------
    // PUSH / POP
    // ---------------------------------------------------------------------

    /// Writes `item` at the tail. Hands the item back if the ring is full.
    #[inline]
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }

        self.slots[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.capacity();
        self.len += 1;

        debug_assert_bounded_count!(self.len, self.capacity());
        debug_assert_index_consistent!(self.head, self.tail, self.len, self.capacity());

        Ok(())
    }

    /// Removes the item at the head, or returns `None` if the ring is empty.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let item = self.slots[self.head].take();
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;

        debug_assert_index_consistent!(self.head, self.tail, self.len, self.capacity());

        item
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("head", &self.head)
            .field("tail", &self.tail)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_push_pop_fifo() {
        let mut ring = RingBuffer::<u64>::new(4);

        assert!(ring.try_push(100).is_ok());
        assert!(ring.try_push(200).is_ok());
        assert!(ring.try_push(300).is_ok());
        assert_eq!(ring.len(), 3);

        assert_eq!(ring.try_pop(), Some(100));
        assert_eq!(ring.try_pop(), Some(200));
        assert_eq!(ring.try_pop(), Some(300));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_ring_full_returns_item() {
        let mut ring = RingBuffer::<u64>::new(2);

        assert!(ring.try_push(1).is_ok());
        assert!(ring.try_push(2).is_ok());
        assert!(ring.is_full());

        // Full: no mutation, item handed back
        assert_eq!(ring.try_push(3), Err(3));
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.tail(), 0);
    }

    #[test]
    fn test_ring_empty_pop() {
        let mut ring = RingBuffer::<u64>::new(3);
        assert_eq!(ring.try_pop(), None);
        assert_eq!(ring.head(), 0);
    }

    #[test]
    fn test_ring_wrap_around_non_power_of_two() {
        let mut ring = RingBuffer::<u64>::new(3);

        for i in 0..100 {
            assert!(ring.try_push(i).is_ok());
            if i % 2 == 1 {
                assert_eq!(ring.try_pop(), Some(i - 1));
                assert_eq!(ring.try_pop(), Some(i));
            }
            assert!(ring.head() < 3);
            assert!(ring.tail() < 3);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn test_ring_capacity_one_alternates() {
        let mut ring = RingBuffer::<u64>::new(1);

        for i in 0..10 {
            assert!(ring.try_push(i).is_ok());
            assert_eq!(ring.try_push(i + 100), Err(i + 100));
            assert_eq!(ring.try_pop(), Some(i));
            assert_eq!(ring.try_pop(), None);
        }
    }

    #[test]
    fn test_ring_drop_releases_queued_items() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        struct DropTracker;

        impl Drop for DropTracker {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROP_COUNT.store(0, Ordering::SeqCst);

        let mut ring = RingBuffer::<DropTracker>::new(8);
        for _ in 0..5 {
            assert!(ring.try_push(DropTracker).is_ok());
        }

        drop(ring.try_pop());
        drop(ring.try_pop());
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 2);

        drop(ring);
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 5);
    }

    #[test]
    #[should_panic(expected = "ring capacity must be positive")]
    fn test_ring_zero_capacity_panics() {
        let _ = RingBuffer::<u64>::new(0);
    }
}
