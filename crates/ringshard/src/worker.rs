//! Producer and consumer state machines.
//!
//! Each worker is bound to one shard for its whole life and loops:
//! lock the shard, check the shard's target, try to move one item, unlock.
//! A worker stops only when its shard's counter for its side reaches the
//! target; there is no cancellation and no timeout. Between attempts it does
//! not block, only spins or yields as selected by [`PollStrategy`].
//!
//! [`PollStrategy`]: crate::PollStrategy

use crate::backoff::Poller;
use crate::{BufferPool, Consume, Produce, Shard, WorkerMetrics};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which side of a shard a worker serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerRole {
    Producer,
    Consumer,
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Producer => f.write_str("producer"),
            Self::Consumer => f.write_str("consumer"),
        }
    }
}

/// Lifecycle of a worker. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Done,
}

/// Outcome of one locked attempt.
enum Attempt {
    Moved,
    Idle,
    TargetReached,
}

/// A poll-and-act loop bound to one shard.
pub trait Worker: Send {
    const ROLE: WorkerRole;

    /// Worker index within its role.
    fn id(&self) -> usize;

    /// Index of the shard this worker is bound to.
    fn buffer(&self) -> usize;

    fn state(&self) -> WorkerState;

    fn metrics(&self) -> WorkerMetrics;

    /// Performs one lock-acquire/attempt/release cycle.
    fn step(&mut self) -> WorkerState;

    /// Steps until `Done` and returns the worker's metrics.
    fn run(mut self) -> WorkerMetrics
    where
        Self: Sized,
    {
        debug!(role = %Self::ROLE, worker = self.id(), buffer = self.buffer(), "worker started");

        while self.step() == WorkerState::Running {}

        let metrics = self.metrics();
        debug!(
            role = %Self::ROLE,
            worker = self.id(),
            buffer = self.buffer(),
            moved = metrics.items_moved,
            idle_polls = metrics.idle_polls,
            "worker completed"
        );
        metrics
    }
}

/// State shared by both roles.
struct Binding {
    pool: Arc<BufferPool>,
    id: usize,
    buffer: usize,
    state: WorkerState,
    poller: Poller,
    metrics: WorkerMetrics,
}

impl Binding {
    fn new(pool: Arc<BufferPool>, id: usize, buffer: Option<usize>) -> Option<Self> {
        let buffer = buffer?;
        let poller = Poller::new(pool.config().poll);
        Some(Self {
            pool,
            id,
            buffer,
            state: WorkerState::Running,
            poller,
            metrics: WorkerMetrics::new(),
        })
    }

    #[inline]
    fn shard(&self) -> &Shard {
        &self.pool.shards()[self.buffer]
    }

    /// Records an attempt and advances the state machine. The shard lock
    /// must already be released.
    fn record(&mut self, attempt: Attempt) -> WorkerState {
        match attempt {
            Attempt::Moved => {
                self.metrics.items_moved += 1;
                self.poller.progressed();
            }
            Attempt::Idle => {
                self.metrics.idle_polls += 1;
                self.poller.idle();
            }
            Attempt::TargetReached => self.state = WorkerState::Done,
        }
        self.state
    }
}

// =============================================================================
// PRODUCER
// =============================================================================

/// Pushes the shard's next sequential item until `items_sent` reaches the target.
pub struct ProducerWorker {
    binding: Binding,
}

impl ProducerWorker {
    /// Binds producer `id` to the shard the pool's partition assigns it.
    /// Returns `None` if `id` is not a producer index of this pool.
    pub fn new(pool: Arc<BufferPool>, id: usize) -> Option<Self> {
        let buffer = pool.partition().producer_buffer(id);
        Binding::new(pool, id, buffer).map(|binding| Self { binding })
    }
}

impl Worker for ProducerWorker {
    const ROLE: WorkerRole = WorkerRole::Producer;

    fn id(&self) -> usize {
        self.binding.id
    }

    fn buffer(&self) -> usize {
        self.binding.buffer
    }

    fn state(&self) -> WorkerState {
        self.binding.state
    }

    fn metrics(&self) -> WorkerMetrics {
        self.binding.metrics
    }

    fn step(&mut self) -> WorkerState {
        if self.binding.state == WorkerState::Done {
            return WorkerState::Done;
        }

        // Guard drops at the end of the statement
        let attempt = match self.binding.shard().lock().try_produce() {
            Produce::Moved(_) => Attempt::Moved,
            Produce::Full => Attempt::Idle,
            Produce::TargetReached => Attempt::TargetReached,
        };

        self.binding.record(attempt)
    }
}

// =============================================================================
// CONSUMER
// =============================================================================

/// Pops from its shard until `items_received` reaches the target.
pub struct ConsumerWorker {
    binding: Binding,
}

impl ConsumerWorker {
    /// Binds consumer `id` to the shard the pool's partition assigns it.
    /// Returns `None` if `id` is not a consumer index of this pool.
    pub fn new(pool: Arc<BufferPool>, id: usize) -> Option<Self> {
        let buffer = pool.partition().consumer_buffer(id);
        Binding::new(pool, id, buffer).map(|binding| Self { binding })
    }
}

impl Worker for ConsumerWorker {
    const ROLE: WorkerRole = WorkerRole::Consumer;

    fn id(&self) -> usize {
        self.binding.id
    }

    fn buffer(&self) -> usize {
        self.binding.buffer
    }

    fn state(&self) -> WorkerState {
        self.binding.state
    }

    fn metrics(&self) -> WorkerMetrics {
        self.binding.metrics
    }

    fn step(&mut self) -> WorkerState {
        if self.binding.state == WorkerState::Done {
            return WorkerState::Done;
        }

        let attempt = match self.binding.shard().lock().try_consume() {
            Consume::Moved(_) => Attempt::Moved,
            Consume::Empty => Attempt::Idle,
            Consume::TargetReached => Attempt::TargetReached,
        };

        self.binding.record(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn pool(config: Config) -> Arc<BufferPool> {
        Arc::new(BufferPool::new(config).unwrap())
    }

    #[test]
    fn test_producer_stops_at_target_without_overshoot() {
        let pool = pool(Config::new(8, 1, 1, 1, 5));
        let mut producer = ProducerWorker::new(Arc::clone(&pool), 0).unwrap();

        for _ in 0..5 {
            assert_eq!(producer.step(), WorkerState::Running);
        }
        assert_eq!(producer.state(), WorkerState::Running);
        // Sixth lock acquisition observes the target
        assert_eq!(producer.step(), WorkerState::Done);
        assert_eq!(producer.state(), WorkerState::Done);
        assert_eq!(producer.step(), WorkerState::Done);

        let stats = pool.stats();
        assert_eq!(stats[0].items_sent, 5);
        assert_eq!(stats[0].len, 5);
        assert_eq!(producer.metrics().items_moved, 5);
    }

    #[test]
    fn test_producer_idles_when_full() {
        let pool = pool(Config::new(2, 1, 1, 1, 10));
        let mut producer = ProducerWorker::new(Arc::clone(&pool), 0).unwrap();

        producer.step();
        producer.step();
        assert_eq!(producer.step(), WorkerState::Running);
        assert_eq!(producer.metrics().idle_polls, 1);
        assert_eq!(pool.stats()[0].items_sent, 2);
    }

    #[test]
    fn test_consumer_idles_when_empty_then_drains() {
        let pool = pool(Config::new(4, 1, 1, 1, 3));
        let mut consumer = ConsumerWorker::new(Arc::clone(&pool), 0).unwrap();
        let mut producer = ProducerWorker::new(Arc::clone(&pool), 0).unwrap();

        assert_eq!(consumer.step(), WorkerState::Running);
        assert_eq!(consumer.state(), WorkerState::Running);
        assert_eq!(consumer.metrics().idle_polls, 1);

        while producer.step() == WorkerState::Running {}
        while consumer.step() == WorkerState::Running {}
        assert_eq!(consumer.state(), WorkerState::Done);

        let stats = pool.stats()[0];
        assert!(stats.is_complete());
        assert_eq!(stats.len, 0);
        assert_eq!(consumer.metrics().items_moved, 3);
    }

    #[test]
    fn test_workers_bind_per_partition() {
        let pool = pool(Config::new(4, 2, 5, 2, 10));
        assert_eq!(ProducerWorker::new(Arc::clone(&pool), 1).unwrap().buffer(), 0);
        assert_eq!(ProducerWorker::new(Arc::clone(&pool), 4).unwrap().buffer(), 1);
        assert_eq!(ConsumerWorker::new(Arc::clone(&pool), 1).unwrap().buffer(), 1);
        assert!(ProducerWorker::new(Arc::clone(&pool), 5).is_none());
        assert!(ConsumerWorker::new(pool, 2).is_none());
    }

    #[test]
    fn test_zero_target_finishes_immediately() {
        let pool = pool(Config::new(4, 2, 2, 2, 1));
        let producer = ProducerWorker::new(Arc::clone(&pool), 0).unwrap();
        let consumer = ConsumerWorker::new(pool, 1).unwrap();

        assert_eq!(producer.run().items_moved, 0);
        assert_eq!(consumer.run().items_moved, 0);
    }
}
