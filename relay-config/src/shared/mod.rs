//! Shared configuration types for relay transfers.

mod base;
mod runner;
mod transfer;

pub use base::ValidationError;
pub use runner::{RunnerConfig, SourceConfig};
pub use transfer::{CompletionMode, TransferConfig};
