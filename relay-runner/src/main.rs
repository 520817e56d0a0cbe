//! Relay runner binary.
//!
//! Loads the configuration, initializes tracing, and runs one transfer of the configured source
//! items on a multi-threaded tokio runtime, failing when verification does not pass.

use std::process::ExitCode;

use relay_config::shared::RunnerConfig;
use relay_telemetry::tracing::init_tracing;
use tracing::error;

use crate::config::load_runner_config;
use crate::core::start_runner_with_config;
use crate::error::{RunnerError, RunnerResult};

mod config;
mod core;
mod error;

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> RunnerResult<()> {
    let runner_config = load_runner_config()?;

    init_tracing(env!("CARGO_BIN_NAME")).map_err(RunnerError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(runner_config))?;

    Ok(())
}

async fn async_main(runner_config: RunnerConfig) -> RunnerResult<()> {
    if let Err(err) = start_runner_with_config(runner_config).await {
        error!("{err}");

        return Err(err);
    }

    Ok(())
}
