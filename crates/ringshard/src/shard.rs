use crate::invariants::{debug_assert_counter_order, debug_assert_fifo_value};
use crate::RingBuffer;
use crossbeam_utils::CachePadded;
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;

/// One ring buffer plus its progress counters, guarded by a single lock.
///
/// The ring is only reachable through a [`ShardGuard`], so every push and pop
/// happens with the lock held and counter updates land in the same critical
/// section as the slot mutation. No lock ever spans two shards.
pub struct Shard {
    index: usize,
    items_to_send: u64,
    state: CachePadded<Mutex<ShardState>>,
}

struct ShardState {
    ring: RingBuffer<u64>,
    items_sent: u64,
    items_received: u64,
    /// Wrapping sum of every popped value.
    received_checksum: u64,
    /// Highest occupancy observed after a push.
    high_water: usize,
}

/// Counters of one shard, read under its lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShardStats {
    pub index: usize,
    pub capacity: usize,
    pub items_to_send: u64,
    pub items_sent: u64,
    pub items_received: u64,
    pub received_checksum: u64,
    pub len: usize,
    pub high_water: usize,
}

impl Shard {
    /// Creates shard `index` with an empty ring of `capacity` slots.
    pub fn new(index: usize, capacity: usize, items_to_send: u64) -> Self {
        Self {
            index,
            items_to_send,
            state: CachePadded::new(Mutex::new(ShardState {
                ring: RingBuffer::new(capacity),
                items_sent: 0,
                items_received: 0,
                received_checksum: 0,
                high_water: 0,
            })),
        }
    }

    /// Position of this shard in its pool.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Items this shard's workers must move before stopping.
    #[inline]
    pub fn items_to_send(&self) -> u64 {
        self.items_to_send
    }

    /// First item value of this shard. Values `base..base + items_to_send`
    /// belong to this shard alone.
    #[inline]
    pub fn item_base(&self) -> u64 {
        self.index as u64 * self.items_to_send
    }

    /// Acquires the shard lock.
    #[inline]
    pub fn lock(&self) -> ShardGuard<'_> {
        ShardGuard {
            shard: self,
            state: self.state.lock(),
        }
    }

    /// Reads the counters under the lock.
    pub fn stats(&self) -> ShardStats {
        let state = self.state.lock();
        ShardStats {
            index: self.index,
            capacity: state.ring.capacity(),
            items_to_send: self.items_to_send,
            items_sent: state.items_sent,
            items_received: state.items_received,
            received_checksum: state.received_checksum,
            len: state.ring.len(),
            high_water: state.high_water,
        }
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("index", &self.index)
            .field("items_to_send", &self.items_to_send)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to one shard. The lock is released on drop.
pub struct ShardGuard<'a> {
    shard: &'a Shard,
    state: MutexGuard<'a, ShardState>,
}

impl ShardGuard<'_> {
    #[inline]
    pub fn items_to_send(&self) -> u64 {
        self.shard.items_to_send
    }

    #[inline]
    pub fn items_sent(&self) -> u64 {
        self.state.items_sent
    }

    #[inline]
    pub fn items_received(&self) -> u64 {
        self.state.items_received
    }

    /// Current ring occupancy.
    #[inline]
    pub fn len(&self) -> usize {
        self.state.ring.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state.ring.is_empty()
    }

    /// Value the next successful push should carry.
    #[inline]
    pub fn next_item(&self) -> u64 {
        self.shard.item_base() + self.state.items_sent
    }

    /// Pushes the shard's next item unless the target is reached or the ring
    /// is full. Checking the target and pushing happen under the same lock.
    pub fn try_produce(&mut self) -> Produce {
        if self.state.items_sent >= self.shard.items_to_send {
            return Produce::TargetReached;
        }
        let item = self.next_item();
        match self.try_push(item) {
            Ok(()) => Produce::Moved(item),
            Err(_) => Produce::Full,
        }
    }

    /// Pops the oldest item unless the target is reached or the ring is
    /// empty. Checking the target and popping happen under the same lock.
    pub fn try_consume(&mut self) -> Consume {
        if self.state.items_received >= self.shard.items_to_send {
            return Consume::TargetReached;
        }
        match self.try_pop() {
            Some(item) => Consume::Moved(item),
            None => Consume::Empty,
        }
    }

    /// Pushes `item` and counts it as sent. Hands the item back if full.
    /// Callers check the target first.
    fn try_push(&mut self, item: u64) -> Result<(), u64> {
        let state = &mut *self.state;
        state.ring.try_push(item)?;
        state.items_sent += 1;
        state.high_water = state.high_water.max(state.ring.len());

        debug_assert_counter_order!(state.items_received, state.items_sent, self.shard.items_to_send);
        Ok(())
    }

    /// Pops the oldest item and counts it as received.
    fn try_pop(&mut self) -> Option<u64> {
        let state = &mut *self.state;
        let item = state.ring.try_pop()?;

        debug_assert_fifo_value!(
            self.shard.index,
            self.shard.item_base() + state.items_received,
            item
        );

        state.items_received += 1;
        state.received_checksum = state.received_checksum.wrapping_add(item);

        debug_assert_counter_order!(state.items_received, state.items_sent, self.shard.items_to_send);
        Some(item)
    }
}

/// Outcome of [`ShardGuard::try_produce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Produce {
    /// The item with this value was pushed.
    Moved(u64),
    Full,
    /// `items_sent` already equals the target; nothing was pushed.
    TargetReached,
}

/// Outcome of [`ShardGuard::try_consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consume {
    /// The item with this value was popped.
    Moved(u64),
    Empty,
    /// `items_received` already equals the target; nothing was popped.
    TargetReached,
}

impl ShardStats {
    /// Checksum a complete run must produce: the sum of the contiguous range
    /// `base..base + items_to_send`.
    pub fn expected_checksum(&self) -> u64 {
        let base = self.index as u64 * self.items_to_send;
        let n = self.items_to_send;
        if n == 0 {
            return 0;
        }
        // n·base + n(n-1)/2, halving whichever factor is even
        let triangle = if n % 2 == 0 {
            (n / 2).wrapping_mul(n - 1)
        } else {
            n.wrapping_mul((n - 1) / 2)
        };
        n.wrapping_mul(base).wrapping_add(triangle)
    }

    /// True once both sides reached the target.
    pub fn is_complete(&self) -> bool {
        self.items_sent == self.items_to_send && self.items_received == self.items_to_send
    }
}
