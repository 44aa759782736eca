//! Logging bootstrap for test binaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`) that
/// writes through the test harness's captured output.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}
