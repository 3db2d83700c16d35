// common/src/utils.rs
use tracing_subscriber::EnvFilter;

/// Setup tracing for consistent logging across binaries.
///
/// `RUST_LOG` wins over `default_directive`. Calling this twice is harmless.
pub fn setup_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
