use std::sync::Once;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable that turns on log output in tests.
const ENABLE_TRACING_ENV_NAME: &str = "ENABLE_TRACING";

/// Guards the global subscriber installation done by [`init_test_tracing`].
static INIT_TEST_TRACING: Once = Once::new();

/// Errors returned while installing the global tracing subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber has already been installed.
    #[error("failed to install the tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Builds the filter used when `RUST_LOG` is not set.
fn default_filter(app_name: &str) -> EnvFilter {
    let app_target = app_name.replace('-', "_");
    EnvFilter::new(format!("{app_target}=info,relay=info"))
}

/// Installs the global tracing subscriber for a binary.
///
/// `RUST_LOG` takes precedence. Otherwise the binary's own target and the `relay` engine log at
/// `info`.
pub fn init_tracing(app_name: &str) -> Result<(), TracingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(app_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_thread_names(true))
        .try_init()?;

    Ok(())
}

/// Installs a test-friendly subscriber once per process.
///
/// Output is only produced when `ENABLE_TRACING` is set, so test runs stay quiet by default.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        if std::env::var(ENABLE_TRACING_ENV_NAME).is_err() {
            return;
        }

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relay=debug"));

        // Another harness may already own the global subscriber, in which case its output wins.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer().with_thread_names(true))
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_targets_binary_and_engine() {
        let filter = default_filter("relay-runner");
        let rendered = filter.to_string();
        assert!(rendered.contains("relay_runner=info"));
        assert!(rendered.contains("relay=info"));
    }

    #[test]
    fn test_tracing_can_be_initialized_repeatedly() {
        init_test_tracing();
        init_test_tracing();
    }
}
