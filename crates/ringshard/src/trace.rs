//! Tracing subscriber setup for the binary, benchmarks and tests.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a global fmt subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` the filter is `ringshard=info`, or `ringshard=debug`
/// when `verbose` is set (per-worker start/finish events). Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "ringshard=debug" } else { "ringshard=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}
