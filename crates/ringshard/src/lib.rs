//! RingShard - Sharded Bounded-Buffer Engine
//!
//! A fixed number of fixed-capacity ring buffers, each behind its own lock,
//! shared by pools of producer and consumer threads. Workers are statically
//! partitioned across buffers and each stops independently once its buffer
//! has moved its share of a global item target.
//!
//! # Key Features
//!
//! - One `parking_lot` mutex per buffer; no lock ever covers two buffers
//! - Precomputed worker → buffer tables (remainder clamps onto the last buffer)
//! - Non-blocking push/pop; workers busy-poll (optionally with spin/yield backoff)
//! - Per-buffer FIFO with globally unique, contiguous item values
//! - Run reports as text or JSON, with a one-buffer baseline for comparison
//!
//! # Example
//!
//! ```
//! use ringshard::{Config, Harness};
//!
//! // 4 slots per buffer, 2 buffers, 4 producers, 4 consumers, 1000 items
//! let harness = Harness::new(Config::new(4, 2, 4, 4, 1000)).unwrap();
//! let report = harness.run().unwrap();
//!
//! assert!(report.is_conserved());
//! assert_eq!(report.items_received, 1000);
//! println!("{report}");
//! ```

mod backoff;
mod config;
mod error;
mod harness;
mod invariants;
mod metrics;
mod partition;
mod pool;
mod report;
mod ring;
mod shard;
mod trace;
mod worker;

pub use backoff::Backoff;
pub use config::{Config, PollStrategy, NON_SCALING_CONFIG, SHARDED_CONFIG};
pub use error::{ConfigError, HarnessError};
pub use harness::Harness;
pub use metrics::WorkerMetrics;
pub use partition::Partition;
pub use pool::BufferPool;
pub use report::{RunReport, ShardReport};
pub use ring::RingBuffer;
pub use shard::{Consume, Produce, Shard, ShardGuard, ShardStats};
pub use trace::init_tracing;
pub use worker::{ConsumerWorker, ProducerWorker, Worker, WorkerRole, WorkerState};
