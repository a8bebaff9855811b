use crate::{Config, ShardStats, WorkerMetrics};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Final counters of one shard and how many workers were bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShardReport {
    #[serde(flatten)]
    pub stats: ShardStats,
    /// Producers the partition assigned to this shard.
    pub producers: usize,
    /// Consumers the partition assigned to this shard.
    pub consumers: usize,
}

impl ShardReport {
    /// True if the values received are exactly the shard's contiguous range.
    pub fn checksum_ok(&self) -> bool {
        self.stats.items_received != self.stats.items_to_send
            || self.stats.received_checksum == self.stats.expected_checksum()
    }
}

/// Outcome of a harness run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub config: Config,
    /// Shards that took part in the run, in index order.
    pub shards: Vec<ShardReport>,
    pub items_sent: u64,
    pub items_received: u64,
    /// Sum of the participating shards' targets.
    pub expected_items: u64,
    /// Remainder of the target that no shard was given.
    pub dropped_items: u64,
    pub producers: WorkerMetrics,
    pub consumers: WorkerMetrics,
    pub spawn_failures: usize,
    pub panicked_workers: usize,
    /// Shards left with no running producer or no running consumer.
    pub unstaffed_buffers: Vec<usize>,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

impl RunReport {
    /// Sent and received totals both equal the scheduled item count and every
    /// shard received exactly its own values.
    pub fn is_conserved(&self) -> bool {
        self.items_sent == self.expected_items
            && self.items_received == self.expected_items
            && self.shards.iter().all(ShardReport::checksum_ok)
    }

    /// Received items per second of wall-clock time.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.items_received as f64 / secs
        } else {
            0.0
        }
    }

    /// How many times faster this run was than `baseline`.
    pub fn speedup_over(&self, baseline: &RunReport) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            baseline.elapsed.as_secs_f64() / secs
        } else {
            0.0
        }
    }

    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        let title = if c.buffer_count == 1 {
            "NON-SCALING BOUNDED BUFFER"
        } else {
            "SCALING BOUNDED BUFFERS"
        };

        writeln!(f, "{title}")?;
        writeln!(
            f,
            "Buffers: {} x {} slots, producers: {}, consumers: {}, poll: {:?}",
            c.buffer_count, c.buffer_capacity, c.producer_count, c.consumer_count, c.poll
        )?;
        writeln!(
            f,
            "Items to send: {} ({} per buffer, {} dropped)",
            c.total_item_target,
            c.items_per_buffer(),
            self.dropped_items
        )?;

        for shard in &self.shards {
            let s = &shard.stats;
            writeln!(
                f,
                "  buffer {}: {} producers, {} consumers, sent {}, received {}, high water {}/{}",
                s.index, shard.producers, shard.consumers, s.items_sent, s.items_received,
                s.high_water, s.capacity
            )?;
        }

        if self.spawn_failures > 0 {
            writeln!(f, "(!) {} worker threads failed to start", self.spawn_failures)?;
        }
        if self.panicked_workers > 0 {
            writeln!(f, "(!) {} workers panicked", self.panicked_workers)?;
        }
        if !self.unstaffed_buffers.is_empty() {
            writeln!(f, "(!) unstaffed buffers: {:?}", self.unstaffed_buffers)?;
        }

        writeln!(
            f,
            "Idle polls: producers {:.1}%, consumers {:.1}%",
            self.producers.idle_ratio() * 100.0,
            self.consumers.idle_ratio() * 100.0
        )?;
        writeln!(
            f,
            "{} total items sent, and {} total items received.",
            self.items_sent, self.items_received
        )?;
        write!(
            f,
            "Time taken to send {} items: {:.6} seconds ({:.2} M items/s)",
            self.expected_items,
            self.elapsed.as_secs_f64(),
            self.throughput() / 1_000_000.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(index: usize, target: u64, received: u64, checksum: u64) -> ShardReport {
        ShardReport {
            stats: ShardStats {
                index,
                capacity: 4,
                items_to_send: target,
                items_sent: target,
                items_received: received,
                received_checksum: checksum,
                len: (target - received) as usize,
                high_water: 4,
            },
            producers: 1,
            consumers: 1,
        }
    }

    fn report(shards: Vec<ShardReport>) -> RunReport {
        let items_sent = shards.iter().map(|s| s.stats.items_sent).sum();
        let items_received = shards.iter().map(|s| s.stats.items_received).sum();
        let expected_items = shards.iter().map(|s| s.stats.items_to_send).sum();
        RunReport {
            config: Config::new(4, shards.len(), 2, 2, 9),
            shards,
            items_sent,
            items_received,
            expected_items,
            dropped_items: 1,
            producers: WorkerMetrics::default(),
            consumers: WorkerMetrics::default(),
            spawn_failures: 0,
            panicked_workers: 0,
            unstaffed_buffers: Vec::new(),
            elapsed: Duration::from_millis(500),
        }
    }

    #[test]
    fn test_conserved_report() {
        // buffer 0 holds 0..4, buffer 1 holds 4..8
        let r = report(vec![shard(0, 4, 4, 6), shard(1, 4, 4, 22)]);
        assert!(r.is_conserved());
        assert_eq!(r.throughput(), 16.0);
    }

    #[test]
    fn test_wrong_checksum_is_not_conserved() {
        let r = report(vec![shard(0, 4, 4, 6), shard(1, 4, 4, 21)]);
        assert!(!r.is_conserved());
    }

    #[test]
    fn test_short_run_is_not_conserved() {
        let r = report(vec![shard(0, 4, 3, 3)]);
        assert!(!r.is_conserved());
    }

    #[test]
    fn test_display_and_json() {
        let r = report(vec![shard(0, 4, 4, 6), shard(1, 4, 4, 22)]);
        let text = r.to_string();
        assert!(text.starts_with("SCALING BOUNDED BUFFERS"));
        assert!(text.contains("8 total items sent, and 8 total items received."));
        assert!(text.contains("buffer 1: 1 producers, 1 consumers"));

        let json: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
        assert_eq!(json["items_received"], 8);
        assert_eq!(json["elapsed_secs"], 0.5);
        assert_eq!(json["shards"][1]["items_to_send"], 4);
        assert_eq!(json["config"]["poll"], "spin");
    }

    #[test]
    fn test_speedup() {
        let fast = report(vec![shard(0, 4, 4, 6)]);
        let mut slow = fast.clone();
        slow.elapsed = Duration::from_secs(2);
        assert_eq!(fast.speedup_over(&slow), 4.0);
    }
}
