use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Polling completion was selected with a zero poll interval.
    #[error("`transfer.poll_interval_ms` must be greater than 0 when `completion` is `poll`")]
    PollIntervalZero,
}
