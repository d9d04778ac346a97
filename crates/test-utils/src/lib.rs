pub mod builders;
pub mod fake_builder;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use assetforge::logging::LOG_ENV_VAR;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{ConfigFileBuilder, TestProject};
pub use fake_builder::FakeBuilder;

static INIT: Once = Once::new();

/// Capture tracing output per test.
///
/// The filter is read from `ASSETFORGE_LOG`, then `RUST_LOG`, and defaults to
/// `info`. Output only shows up for failing tests unless the harness runs
/// with `--nocapture`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Fail the test if `f` takes longer than ten seconds.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(10), f)
        .await
        .expect("test timed out after 10 seconds")
}
