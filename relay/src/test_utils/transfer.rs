use std::time::Duration;

use tokio::time::timeout;

use crate::error::RelayResult;
use crate::pipeline::{Transfer, TransferStats};
use crate::report::Reporter;

/// Deadline after which a test transfer is considered hung.
///
/// Every transfer in the test suite finishes well under a second, so reaching this means a worker
/// is stuck on the channel.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs `transfer` to completion, panicking if it does not finish within `deadline`.
///
/// # Panics
///
/// Panics when the deadline elapses, which points at a deadlock or a lost wakeup.
pub async fn run_with_timeout<T, R>(
    transfer: &mut Transfer<T, R>,
    deadline: Duration,
) -> RelayResult<TransferStats>
where
    T: Clone + Send + Sync + 'static,
    R: Reporter,
{
    match timeout(deadline, transfer.run()).await {
        Ok(result) => result,
        Err(_) => panic!(
            "Transfer did not complete within {deadline:?}. \
             A worker is most likely blocked on the channel forever."
        ),
    }
}
