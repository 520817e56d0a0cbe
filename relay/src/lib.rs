//! Bounded producer/consumer transfer engine.
//!
//! A [`pipeline::Transfer`] copies an ordered source into an in-memory destination through a
//! fixed-capacity [`concurrency::channel::BoundedChannel`], with one producer and one consumer
//! running concurrently. Back-pressure comes from the producer blocking on a full channel, and
//! completion is signaled by the producer once its last item is inside the channel, so the
//! consumer never stops before draining it. [`verify::verify`] checks the result afterwards.
//!
//! ```rust,no_run
//! use relay::pipeline::Transfer;
//! use relay_config::shared::TransferConfig;
//!
//! # async fn example() -> relay::error::RelayResult<()> {
//! let mut transfer = Transfer::new(&[1, 2, 3, 4, 5], TransferConfig::default())?;
//! transfer.run().await?;
//!
//! assert!(transfer.verify().passed());
//! # Ok(())
//! # }
//! ```
pub mod concurrency;
pub mod destination;
pub mod error;
mod macros;
pub mod pipeline;
pub mod report;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod verify;
pub mod workers;
