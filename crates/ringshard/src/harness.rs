use crate::error::HarnessError;
use crate::report::{RunReport, ShardReport};
use crate::worker::{ConsumerWorker, ProducerWorker, Worker, WorkerRole};
use crate::{BufferPool, Config, WorkerMetrics};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{error, info, warn};

/// Builds a pool, runs every producer and consumer to completion on its own
/// OS thread, and aggregates the shard counters once all of them stopped.
///
/// The harness never touches a shard while workers run.
#[derive(Debug, Clone)]
pub struct Harness {
    config: Config,
}

/// A worker thread that started.
struct Spawned {
    role: WorkerRole,
    id: usize,
    buffer: usize,
    handle: JoinHandle<WorkerMetrics>,
}

impl Harness {
    /// Creates a harness for a validated configuration.
    pub fn new(config: Config) -> Result<Self, HarnessError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs all workers on all buffers.
    pub fn run(&self) -> Result<RunReport, HarnessError> {
        let selected = vec![true; self.config.buffer_count];
        self.execute(&selected)
    }

    /// Runs only the workers bound to `buffers`, on a fresh pool. The report
    /// covers the selected shards only.
    pub fn run_buffers(&self, buffers: &[usize]) -> Result<RunReport, HarnessError> {
        let mut selected = vec![false; self.config.buffer_count];
        for &index in buffers {
            let slot = selected.get_mut(index).ok_or(HarnessError::NoSuchBuffer {
                index,
                buffers: self.config.buffer_count,
            })?;
            *slot = true;
        }
        self.execute(&selected)
    }

    fn execute(&self, selected: &[bool]) -> Result<RunReport, HarnessError> {
        let pool = Arc::new(BufferPool::new(self.config)?);
        let producer_count = pool.partition().producer_count();
        let consumer_count = pool.partition().consumer_count();
        let mut spawned = Vec::with_capacity(producer_count + consumer_count);
        let mut spawn_failures = 0;

        info!(
            buffers = self.config.buffer_count,
            producers = producer_count,
            consumers = consumer_count,
            "run started"
        );
        let start = Instant::now();

        for id in 0..producer_count {
            if let Some(worker) = ProducerWorker::new(Arc::clone(&pool), id) {
                if selected[worker.buffer()] {
                    launch(worker, &mut spawned, &mut spawn_failures);
                }
            }
        }
        for id in 0..consumer_count {
            if let Some(worker) = ConsumerWorker::new(Arc::clone(&pool), id) {
                if selected[worker.buffer()] {
                    launch(worker, &mut spawned, &mut spawn_failures);
                }
            }
        }

        let unstaffed = unstaffed_buffers(&pool, selected, &spawned);
        for &buffer in &unstaffed {
            warn!(buffer, "buffer has no running producer or consumer; its workers may never finish");
        }

        let mut producers = WorkerMetrics::default();
        let mut consumers = WorkerMetrics::default();
        let mut panicked_workers = 0;

        for worker in spawned {
            match worker.handle.join() {
                Ok(metrics) => match worker.role {
                    WorkerRole::Producer => producers.merge(&metrics),
                    WorkerRole::Consumer => consumers.merge(&metrics),
                },
                Err(_) => {
                    error!(role = %worker.role, worker = worker.id, buffer = worker.buffer, "worker panicked");
                    panicked_workers += 1;
                }
            }
        }

        let elapsed = start.elapsed();

        let producer_counts = pool.partition().producers_per_buffer();
        let consumer_counts = pool.partition().consumers_per_buffer();
        let shards: Vec<ShardReport> = pool
            .stats()
            .into_iter()
            .filter(|stats| selected[stats.index])
            .map(|stats| ShardReport {
                stats,
                producers: producer_counts[stats.index],
                consumers: consumer_counts[stats.index],
            })
            .collect();

        let items_sent = shards.iter().map(|s| s.stats.items_sent).sum();
        let items_received = shards.iter().map(|s| s.stats.items_received).sum();
        let expected_items = shards.iter().map(|s| s.stats.items_to_send).sum();

        info!(
            sent = items_sent,
            received = items_received,
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );

        Ok(RunReport {
            config: self.config,
            shards,
            items_sent,
            items_received,
            expected_items,
            dropped_items: self.config.dropped_items(),
            producers,
            consumers,
            spawn_failures,
            panicked_workers,
            unstaffed_buffers: unstaffed,
            elapsed,
        })
    }
}

fn spawn<W: Worker + 'static>(worker: W) -> io::Result<JoinHandle<WorkerMetrics>> {
    thread::Builder::new()
        .name(format!("ringshard-{}-{}", W::ROLE, worker.id()))
        .spawn(move || worker.run())
}

/// Starts `worker` on its own thread. A failed start is logged and counted,
/// and the run goes on without that worker.
fn launch<W: Worker + 'static>(worker: W, spawned: &mut Vec<Spawned>, failures: &mut usize) {
    let (id, buffer) = (worker.id(), worker.buffer());
    match spawn(worker) {
        Ok(handle) => spawned.push(Spawned {
            role: W::ROLE,
            id,
            buffer,
            handle,
        }),
        Err(e) => {
            error!(role = %W::ROLE, worker = id, buffer, error = %e, "worker thread creation failed");
            *failures += 1;
        }
    }
}

fn unstaffed_buffers(pool: &BufferPool, selected: &[bool], spawned: &[Spawned]) -> Vec<usize> {
    let bindings: Vec<(WorkerRole, usize)> = spawned.iter().map(|w| (w.role, w.buffer)).collect();
    let targets: Vec<u64> = pool.shards().iter().map(|s| s.items_to_send()).collect();
    find_unstaffed(&targets, selected, &bindings)
}

/// Selected buffers with a nonzero target that lack a producer or a consumer.
fn find_unstaffed(targets: &[u64], selected: &[bool], bindings: &[(WorkerRole, usize)]) -> Vec<usize> {
    let mut producers = vec![0usize; targets.len()];
    let mut consumers = vec![0usize; targets.len()];
    for &(role, buffer) in bindings {
        match role {
            WorkerRole::Producer => producers[buffer] += 1,
            WorkerRole::Consumer => consumers[buffer] += 1,
        }
    }

    (0..targets.len())
        .filter(|&b| selected[b] && targets[b] > 0 && (producers[b] == 0 || consumers[b] == 0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PollStrategy;

    #[test]
    fn test_run_conserves_items() {
        let harness = Harness::new(Config::new(4, 2, 2, 2, 1000)).unwrap();
        let report = harness.run().unwrap();

        assert!(report.is_conserved());
        assert_eq!(report.items_sent, 1000);
        assert_eq!(report.items_received, 1000);
        assert_eq!(report.producers.workers, 2);
        assert_eq!(report.consumers.items_moved, 1000);
        assert_eq!(report.spawn_failures, 0);
        assert!(report.unstaffed_buffers.is_empty());
    }

    #[test]
    fn test_run_with_backoff() {
        let config = Config::new(2, 1, 3, 3, 500).with_poll(PollStrategy::Backoff);
        let report = Harness::new(config).unwrap().run().unwrap();
        assert!(report.is_conserved());
    }

    #[test]
    fn test_run_buffers_rejects_unknown_index() {
        let harness = Harness::new(Config::new(4, 2, 2, 2, 10)).unwrap();
        assert_eq!(
            harness.run_buffers(&[2]).unwrap_err(),
            HarnessError::NoSuchBuffer { index: 2, buffers: 2 }
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = Harness::new(Config::new(4, 4, 2, 4, 10)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_find_unstaffed() {
        use WorkerRole::{Consumer, Producer};

        let targets = [10, 10, 0, 10];
        let selected = [true, true, true, false];
        let bindings = [(Producer, 0), (Consumer, 0), (Producer, 1), (Producer, 3)];

        // 1 lacks a consumer; 2 has nothing to do; 3 is not selected
        assert_eq!(find_unstaffed(&targets, &selected, &bindings), vec![1]);
    }
}
