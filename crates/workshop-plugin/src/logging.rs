//! Subscriber setup for hosts and tests that want log output.
//!
//! The library crates only emit through `tracing`; nothing is printed until
//! one of these is called.

use tracing_subscriber::EnvFilter;

fn make_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_level`. Does nothing if a subscriber is already installed.
pub fn init_tracing(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(make_filter(default_level))
        .with_target(true)
        .try_init();
}

/// Like [`init_tracing`], but writes through the test harness so output is
/// captured per test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(make_filter("debug"))
        .with_test_writer()
        .try_init();
}
