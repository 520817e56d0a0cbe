//! Destinations receiving the items drained by the consumer.

mod base;
pub mod memory;

pub use base::Destination;
