//! Debug assertion macros for ring buffer and shard invariants.
//!
//! Only active in debug builds, so release builds pay nothing.
//!
//! Used by `RingBuffer<T>` and `Shard`.

// =============================================================================
// Bounded Count
// =============================================================================

/// Assert that occupancy never exceeds capacity.
///
/// **Invariant**: `0 ≤ len ≤ capacity`
///
/// Used in: `RingBuffer::try_push()` after incrementing len
macro_rules! debug_assert_bounded_count {
    ($len:expr, $capacity:expr) => {
        debug_assert!(
            $len <= $capacity,
            "bounded count violated: len {} exceeds capacity {}",
            $len,
            $capacity
        )
    };
}

// =============================================================================
// Index Consistency
// =============================================================================

/// Assert that `len` agrees with the distance from head to tail.
///
/// **Invariant**: `len mod capacity == (tail - head) mod capacity`
///
/// Used in: `RingBuffer::try_push()` and `RingBuffer::try_pop()` after mutation
macro_rules! debug_assert_index_consistent {
    ($head:expr, $tail:expr, $len:expr, $capacity:expr) => {
        debug_assert!(
            ($tail + $capacity - $head) % $capacity == $len % $capacity,
            "index consistency violated: head {} tail {} len {} capacity {}",
            $head,
            $tail,
            $len,
            $capacity
        )
    };
}

// =============================================================================
// Counter Ordering
// =============================================================================

/// Assert the per-buffer counter ordering.
///
/// **Invariant**: `items_received ≤ items_sent ≤ items_to_send`
///
/// Used in: `ShardGuard::try_produce()` and `ShardGuard::try_consume()` while locked
macro_rules! debug_assert_counter_order {
    ($received:expr, $sent:expr, $target:expr) => {
        debug_assert!(
            $received <= $sent && $sent <= $target,
            "counter order violated: received {} sent {} target {}",
            $received,
            $sent,
            $target
        )
    };
}

// =============================================================================
// Per-buffer FIFO
// =============================================================================

/// Assert that a consumer popped exactly the next value the buffer's
/// producers pushed.
///
/// **Invariant**: the k-th value popped from buffer `b` is `b·target + k`
///
/// Used in: `ShardGuard::try_consume()`
macro_rules! debug_assert_fifo_value {
    ($buffer:expr, $expected:expr, $actual:expr) => {
        debug_assert!(
            $expected == $actual,
            "FIFO violated on buffer {}: expected {}, popped {}",
            $buffer,
            $expected,
            $actual
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_counter_order;
pub(crate) use debug_assert_fifo_value;
pub(crate) use debug_assert_index_consistent;
