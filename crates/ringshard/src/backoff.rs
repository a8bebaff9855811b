use crate::PollStrategy;
use std::hint;
use std::thread;

/// Adaptive backoff strategy (Crossbeam-style).
///
/// Spins with exponentially more PAUSE hints, then yields to the OS on every
/// further call until [`reset`](Self::reset). Never parks or blocks.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max before yielding

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Spin while under the limit, yield afterwards.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= Self::SPIN_LIMIT {
            for _ in 0..1u32 << self.step {
                hint::spin_loop();
            }
            self.step += 1;
        } else {
            thread::yield_now();
        }
    }

    /// True once spinning is exhausted and `snooze` yields.
    #[inline]
    pub fn is_yielding(&self) -> bool {
        self.step > Self::SPIN_LIMIT
    }

    /// Reset for next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-worker pacing between attempts, chosen by [`PollStrategy`].
#[derive(Debug)]
pub(crate) enum Poller {
    Spin,
    Backoff(Backoff),
}

impl Poller {
    pub(crate) fn new(strategy: PollStrategy) -> Self {
        match strategy {
            PollStrategy::Spin => Self::Spin,
            PollStrategy::Backoff => Self::Backoff(Backoff::new()),
        }
    }

    /// The last attempt moved nothing.
    #[inline]
    pub(crate) fn idle(&mut self) {
        match self {
            Self::Spin => hint::spin_loop(),
            Self::Backoff(backoff) => backoff.snooze(),
        }
    }

    /// The last attempt moved an item.
    #[inline]
    pub(crate) fn progressed(&mut self) {
        if let Self::Backoff(backoff) = self {
            backoff.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut b = Backoff::new();
        assert_eq!(b.step, 0);

        b.snooze();
        assert!(b.step > 0);

        while !b.is_yielding() {
            b.snooze();
        }
        // Saturates instead of counting forever
        let step = b.step;
        b.snooze();
        assert_eq!(b.step, step);

        b.reset();
        assert_eq!(b.step, 0);
    }

    #[test]
    fn test_poller_resets_on_progress() {
        let mut poller = Poller::new(PollStrategy::Backoff);
        for _ in 0..20 {
            poller.idle();
        }
        poller.progressed();
        match poller {
            Poller::Backoff(b) => assert!(!b.is_yielding()),
            Poller::Spin => panic!("expected backoff poller"),
        }
    }
}
