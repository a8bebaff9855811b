use serde::Serialize;

/// What a worker did over its lifetime.
///
/// Plain counters owned by one worker thread; merged by the harness after join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerMetrics {
    /// Workers folded into this value.
    pub workers: u64,
    /// Successful pushes (producers) or pops (consumers).
    pub items_moved: u64,
    /// Lock acquisitions that found the buffer full (producers) or empty
    /// (consumers) and moved nothing.
    pub idle_polls: u64,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self {
            workers: 1,
            ..Self::default()
        }
    }

    /// Total lock acquisitions, excluding the final one that observed the target.
    #[inline]
    pub fn attempts(&self) -> u64 {
        self.items_moved + self.idle_polls
    }

    /// Fraction of attempts that moved nothing.
    pub fn idle_ratio(&self) -> f64 {
        let attempts = self.attempts();
        if attempts == 0 {
            0.0
        } else {
            self.idle_polls as f64 / attempts as f64
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.workers += other.workers;
        self.items_moved += other.items_moved;
        self.idle_polls += other.idle_polls;
    }
}
