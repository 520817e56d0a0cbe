use relay::pipeline::{Transfer, TransferStats};
use relay::report::format_status;
use relay_config::shared::RunnerConfig;
use tracing::{info, warn};

use crate::error::{RunnerError, RunnerResult};

/// Transfers the configured source items, verifies the result and logs the verification report.
///
/// Returns [`RunnerError::VerificationFailed`] when the destination does not match the source.
pub async fn start_runner_with_config(config: RunnerConfig) -> RunnerResult<TransferStats> {
    info!("starting relay runner");

    log_config(&config);

    let mut transfer = Transfer::new(&config.source.items, config.transfer)?.with_item_details();
    let stats = transfer.run().await?;

    info!(
        "{}",
        format_status(
            "Runner",
            "Transfer complete",
            &format!(
                "{} items in {:?}, {} blocked pushes, {} empty waits",
                stats.consumer.consumed,
                stats.elapsed,
                stats.producer.blocked_pushes,
                stats.consumer.empty_waits
            )
        )
    );

    let report = transfer.verify();
    if !report.passed() {
        warn!("verification report:\n{report}");

        return Err(RunnerError::VerificationFailed(report));
    }

    info!("verification report:\n{report}");

    Ok(stats)
}

fn log_config(config: &RunnerConfig) {
    info!(
        items = config.source.items.len(),
        completion = ?config.transfer.completion,
        poll_interval_ms = config.transfer.poll_interval_ms,
        producer_delay_ms = config.transfer.producer_delay_ms,
        consumer_delay_ms = config.transfer.consumer_delay_ms,
        "runner configuration"
    );
}
