//! Static assignment of worker indices to buffer indices.
//!
//! Worker `w` of a role with `W` workers over `N` buffers lands on buffer
//! `min(w / (W / N), N - 1)`. When `N` does not divide `W` the leftover
//! workers all pile onto the last buffer rather than being spread round-robin.

use crate::error::ConfigError;
use crate::Config;

/// Precomputed producer and consumer → buffer tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    buffer_count: usize,
    producers: Box<[usize]>,
    consumers: Box<[usize]>,
}

impl Partition {
    /// Builds both tables for a validated configuration.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            buffer_count: config.buffer_count,
            producers: assign(config.producer_count, config.buffer_count),
            consumers: assign(config.consumer_count, config.buffer_count),
        })
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffer_count
    }

    #[inline]
    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    #[inline]
    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    /// Buffer index of producer `worker`, or `None` if out of range.
    #[inline]
    pub fn producer_buffer(&self, worker: usize) -> Option<usize> {
        self.producers.get(worker).copied()
    }

    /// Buffer index of consumer `worker`, or `None` if out of range.
    #[inline]
    pub fn consumer_buffer(&self, worker: usize) -> Option<usize> {
        self.consumers.get(worker).copied()
    }

    /// The full producer table, indexed by worker.
    pub fn producer_table(&self) -> &[usize] {
        &self.producers
    }

    /// The full consumer table, indexed by worker.
    pub fn consumer_table(&self) -> &[usize] {
        &self.consumers
    }

    /// Number of producers bound to each buffer.
    pub fn producers_per_buffer(&self) -> Vec<usize> {
        histogram(&self.producers, self.buffer_count)
    }

    /// Number of consumers bound to each buffer.
    pub fn consumers_per_buffer(&self) -> Vec<usize> {
        histogram(&self.consumers, self.buffer_count)
    }
}

fn assign(workers: usize, buffers: usize) -> Box<[usize]> {
    let per_buffer = workers / buffers;
    debug_assert!(per_buffer > 0, "validated config leaves a buffer unstaffed");
    (0..workers)
        .map(|w| (w / per_buffer).min(buffers - 1))
        .collect()
}

fn histogram(table: &[usize], buffers: usize) -> Vec<usize> {
    let mut counts = vec![0; buffers];
    for &buffer in table {
        counts[buffer] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_partition() {
        let partition = Partition::new(&Config::new(10, 4, 16, 32, 0)).unwrap();
        assert_eq!(partition.producers_per_buffer(), vec![4, 4, 4, 4]);
        assert_eq!(partition.consumers_per_buffer(), vec![8, 8, 8, 8]);
        assert_eq!(partition.producer_buffer(0), Some(0));
        assert_eq!(partition.producer_buffer(3), Some(0));
        assert_eq!(partition.producer_buffer(4), Some(1));
        assert_eq!(partition.producer_buffer(15), Some(3));
        assert_eq!(partition.producer_buffer(16), None);
    }

    #[test]
    fn test_remainder_lands_on_last_buffer() {
        let partition = Partition::new(&Config::new(10, 2, 5, 2, 0)).unwrap();
        assert_eq!(partition.producer_count(), 5);
        assert_eq!(partition.consumer_count(), 2);
        assert_eq!(partition.producer_table(), &[0, 0, 1, 1, 1]);
        assert_eq!(partition.producers_per_buffer(), vec![2, 3]);
    }

    #[test]
    fn test_large_remainder_is_not_redistributed() {
        // 7 / 3 = 2 per buffer; workers 6 clamps onto buffer 2
        let partition = Partition::new(&Config::new(10, 3, 3, 7, 0)).unwrap();
        assert_eq!(partition.consumer_table(), &[0, 0, 1, 1, 2, 2, 2]);
        assert_eq!(partition.consumers_per_buffer(), vec![2, 2, 3]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert_eq!(
            Partition::new(&Config::new(10, 3, 2, 3, 0)),
            Err(ConfigError::TooFewProducers { producers: 2, buffers: 3 })
        );
    }
}
