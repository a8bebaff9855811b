//! Error types for pool construction and harness runs.
//!
//! A full or empty buffer is never an error; those are plain return values.

use thiserror::Error;

/// Rejected [`Config`](crate::Config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Ring buffers need at least one slot.
    #[error("buffer capacity must be positive")]
    ZeroCapacity,

    /// The pool needs at least one buffer.
    #[error("buffer count must be positive")]
    ZeroBuffers,

    /// Some buffer would be left without a producer.
    #[error("{producers} producers cannot staff {buffers} buffers")]
    TooFewProducers {
        /// Configured producer count.
        producers: usize,
        /// Configured buffer count.
        buffers: usize,
    },

    /// Some buffer would be left without a consumer.
    #[error("{consumers} consumers cannot staff {buffers} buffers")]
    TooFewConsumers {
        /// Configured consumer count.
        consumers: usize,
        /// Configured buffer count.
        buffers: usize,
    },
}

/// Errors returned by [`Harness`](crate::Harness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// The configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A selected buffer index does not exist in the pool.
    #[error("buffer index {index} out of range (pool has {buffers} buffers)")]
    NoSuchBuffer {
        /// Requested index.
        index: usize,
        /// Number of buffers in the pool.
        buffers: usize,
    },
}

impl HarnessError {
    /// Returns `true` if the error came from configuration validation.
    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
