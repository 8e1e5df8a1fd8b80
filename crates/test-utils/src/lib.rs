pub mod builders;
pub mod flaky;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use probekit::cli::LogLevel;
use probekit::logging::default_directives;
use tracing_subscriber::{EnvFilter, fmt};

pub use flaky::FlakyOperation;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Without `RUST_LOG` the filter matches the binary's default: `info`, with
/// hyper/reqwest/rustls held at `warn` so the HTTP tests stay readable.
/// Override with e.g. `RUST_LOG=probekit=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(LogLevel::Info)));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
///
/// Process tests spawn real children; a hang here means a leaked child or a
/// stuck drain task, so fail loudly instead of blocking the suite.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    with_deadline(Duration::from_secs(10), f).await
}

/// Like [`with_timeout`] with an explicit limit.
pub async fn with_deadline<F, T>(limit: Duration, f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {limit:?}"))
}
