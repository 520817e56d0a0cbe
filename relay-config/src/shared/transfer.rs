use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// How the consumer learns that the producer has finished.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// The producer closes the channel after its last push and the consumer blocks until either an
    /// item arrives or the channel is closed and drained.
    #[default]
    Close,
    /// The consumer pops with a timeout and, whenever the timeout elapses, checks the completion
    /// signal together with channel emptiness.
    Poll,
}

/// Runtime settings of a single transfer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TransferConfig {
    /// Completion protocol used by the consumer.
    #[serde(default)]
    pub completion: CompletionMode,
    /// Consumer pop timeout, in milliseconds, used by [`CompletionMode::Poll`].
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause, in milliseconds, after each produced item.
    #[serde(default)]
    pub producer_delay_ms: u64,
    /// Pause, in milliseconds, after each consumed item.
    #[serde(default)]
    pub consumer_delay_ms: u64,
}

impl TransferConfig {
    /// Default consumer poll timeout in milliseconds.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

    /// Validates transfer configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.completion == CompletionMode::Poll && self.poll_interval_ms == 0 {
            return Err(ValidationError::PollIntervalZero);
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the producer pacing delay, or `None` when producing is unpaced.
    pub fn producer_delay(&self) -> Option<Duration> {
        (self.producer_delay_ms > 0).then(|| Duration::from_millis(self.producer_delay_ms))
    }

    /// Returns the consumer pacing delay, or `None` when consuming is unpaced.
    pub fn consumer_delay(&self) -> Option<Duration> {
        (self.consumer_delay_ms > 0).then(|| Duration::from_millis(self.consumer_delay_ms))
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            completion: CompletionMode::default(),
            poll_interval_ms: default_poll_interval_ms(),
            producer_delay_ms: 0,
            consumer_delay_ms: 0,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    TransferConfig::DEFAULT_POLL_INTERVAL_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_closable_channel() {
        let config = TransferConfig::default();
        assert_eq!(config.completion, CompletionMode::Close);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.producer_delay(), None);
        assert_eq!(config.consumer_delay(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: TransferConfig = serde_json::from_str(r#"{ "completion": "poll" }"#).unwrap();
        assert_eq!(config.completion, CompletionMode::Poll);
        assert_eq!(
            config.poll_interval_ms,
            TransferConfig::DEFAULT_POLL_INTERVAL_MS
        );
    }

    #[test]
    fn zero_poll_interval_is_rejected_only_when_polling() {
        let mut config = TransferConfig {
            poll_interval_ms: 0,
            ..TransferConfig::default()
        };
        assert!(config.validate().is_ok());

        config.completion = CompletionMode::Poll;
        assert_eq!(config.validate(), Err(ValidationError::PollIntervalZero));
    }

    #[test]
    fn pacing_delays_are_converted_to_durations() {
        let config = TransferConfig {
            producer_delay_ms: 10,
            consumer_delay_ms: 15,
            ..TransferConfig::default()
        };
        assert_eq!(config.producer_delay(), Some(Duration::from_millis(10)));
        assert_eq!(config.consumer_delay(), Some(Duration::from_millis(15)));
    }
}
