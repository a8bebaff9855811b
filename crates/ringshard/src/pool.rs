use crate::error::ConfigError;
use crate::{Config, Partition, Shard, ShardStats};
use tracing::{info, warn};

/// N independently locked ring buffers and the tables binding workers to them.
///
/// Built once before any worker starts and never resized; workers share it
/// through an `Arc` and each touches only the shard it is bound to.
#[derive(Debug)]
pub struct BufferPool {
    shards: Vec<Shard>,
    partition: Partition,
    config: Config,
}

impl BufferPool {
    /// Validates `config`, allocates every shard and computes the partition.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let partition = Partition::new(&config)?;
        let items_to_send = config.items_per_buffer();

        let shards = (0..config.buffer_count)
            .map(|index| Shard::new(index, config.buffer_capacity, items_to_send))
            .collect();

        if config.total_item_target < config.buffer_count as u64 {
            warn!(
                total = config.total_item_target,
                buffers = config.buffer_count,
                "item target smaller than buffer count; every buffer gets a target of 0"
            );
        }

        info!(
            buffers = config.buffer_count,
            capacity = config.buffer_capacity,
            items_per_buffer = items_to_send,
            dropped = config.dropped_items(),
            "buffer pool initialized"
        );

        Ok(Self {
            shards,
            partition,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Number of shards.
    #[inline]
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Shard at `index`, or `None` if out of range.
    #[inline]
    pub fn shard(&self, index: usize) -> Option<&Shard> {
        self.shards.get(index)
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    /// Counter snapshot of every shard, in index order.
    pub fn stats(&self) -> Vec<ShardStats> {
        self.shards.iter().map(Shard::stats).collect()
    }

    /// Sum of `items_sent` across shards.
    pub fn total_sent(&self) -> u64 {
        self.shards.iter().map(|s| s.stats().items_sent).sum()
    }

    /// Sum of `items_received` across shards.
    pub fn total_received(&self) -> u64 {
        self.shards.iter().map(|s| s.stats().items_received).sum()
    }
}
