//! Logging setup for sweep binaries.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default [`DEFAULT_FILTER`]).
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    init_with(DEFAULT_FILTER);
}

/// Like [`init`] with a custom fallback filter directive.
pub fn init_with(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init_with("debug");
        tracing::info!("subscriber installed");
    }
}
