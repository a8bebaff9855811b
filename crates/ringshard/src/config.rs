use crate::error::ConfigError;
use serde::Serialize;

const KILO: u64 = 1024;
const MEGA: u64 = KILO * KILO;

/// What a worker does after an attempt that moved nothing (buffer full for a
/// producer, empty for a consumer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStrategy {
    /// Retry immediately with only a CPU spin hint in between.
    #[default]
    Spin,
    /// Spin with exponential PAUSE counts, then yield to the OS scheduler.
    /// Reset after every successful move.
    Backoff,
}

impl PollStrategy {
    /// Parses `spin` or `backoff`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "spin" => Some(Self::Spin),
            "backoff" => Some(Self::Backoff),
            _ => None,
        }
    }
}

/// Configuration for a [`BufferPool`](crate::BufferPool) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Slots per ring buffer.
    pub buffer_capacity: usize,
    /// Number of ring buffers (shards), each with its own lock.
    pub buffer_count: usize,
    /// Number of producer threads.
    pub producer_count: usize,
    /// Number of consumer threads.
    pub consumer_count: usize,
    /// Items to move through the whole pool. Split evenly across buffers;
    /// the remainder of the division is never scheduled.
    pub total_item_target: u64,
    /// Retry behavior for unsuccessful attempts.
    pub poll: PollStrategy,
}

impl Config {
    /// Creates a new configuration with custom settings and busy polling.
    pub const fn new(
        buffer_capacity: usize,
        buffer_count: usize,
        producer_count: usize,
        consumer_count: usize,
        total_item_target: u64,
    ) -> Self {
        Self {
            buffer_capacity,
            buffer_count,
            producer_count,
            consumer_count,
            total_item_target,
            poll: PollStrategy::Spin,
        }
    }

    /// Target item count for each buffer.
    #[inline]
    pub const fn items_per_buffer(&self) -> u64 {
        if self.buffer_count == 0 {
            return 0;
        }
        self.total_item_target / self.buffer_count as u64
    }

    /// Items lost to the integer division in [`items_per_buffer`](Self::items_per_buffer).
    #[inline]
    pub const fn dropped_items(&self) -> u64 {
        if self.buffer_count == 0 {
            return self.total_item_target;
        }
        self.total_item_target % self.buffer_count as u64
    }

    /// Items the pool will actually move when every worker runs to completion.
    #[inline]
    pub const fn scheduled_items(&self) -> u64 {
        self.total_item_target - self.dropped_items()
    }

    /// Checks that every buffer can be staffed and has storage.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.buffer_count == 0 {
            return Err(ConfigError::ZeroBuffers);
        }
        if self.producer_count < self.buffer_count {
            return Err(ConfigError::TooFewProducers {
                producers: self.producer_count,
                buffers: self.buffer_count,
            });
        }
        if self.consumer_count < self.buffer_count {
            return Err(ConfigError::TooFewConsumers {
                consumers: self.consumer_count,
                buffers: self.buffer_count,
            });
        }
        Ok(())
    }

    /// Same workload squeezed through a single buffer and a single lock.
    pub const fn as_baseline(&self) -> Self {
        let mut baseline = *self;
        baseline.buffer_count = 1;
        baseline
    }

    /// Sets the per-buffer capacity.
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Sets the number of buffers.
    pub const fn with_buffers(mut self, count: usize) -> Self {
        self.buffer_count = count;
        self
    }

    /// Sets the number of producer threads.
    pub const fn with_producers(mut self, count: usize) -> Self {
        self.producer_count = count;
        self
    }

    /// Sets the number of consumer threads.
    pub const fn with_consumers(mut self, count: usize) -> Self {
        self.consumer_count = count;
        self
    }

    /// Sets the total item target.
    pub const fn with_items(mut self, total: u64) -> Self {
        self.total_item_target = total;
        self
    }

    /// Sets the poll strategy.
    pub const fn with_poll(mut self, poll: PollStrategy) -> Self {
        self.poll = poll;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        // One production line: a producer, a buffer of 10, a consumer.
        Self::new(10, 1, 1, 1, 10_000_000)
    }
}

/// One buffer, one lock, 16 producers and 32 consumers fighting over it.
pub const NON_SCALING_CONFIG: Config = Config::new(10, 1, 16, 32, 8 * MEGA);

/// Same thread counts split over two independently locked buffers.
pub const SHARDED_CONFIG: Config = Config::new(20, 2, 16, 32, 8 * KILO);
