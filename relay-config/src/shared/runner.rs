use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{TransferConfig, ValidationError};

/// Values handed to the producer by the runner binary.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SourceConfig {
    /// Items to transfer, in order.
    #[serde(default)]
    pub items: Vec<i64>,
}

/// Top-level configuration of the `relay-runner` binary.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub source: SourceConfig,
}

impl RunnerConfig {
    /// Validates the runner configuration and everything nested in it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.transfer.validate()
    }
}

impl Config for RunnerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &["source.items"];
}
