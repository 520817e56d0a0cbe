//! Concurrency primitives coordinating the producer and the consumer of a transfer.
//!
//! - [`channel`] provides the bounded, closable FIFO channel that carries items and applies
//!   back-pressure to the producer when the consumer falls behind.
//! - [`signal`] provides the one-shot completion flag the producer raises after its last push.
//!
//! Closing the channel and raising the signal both happen strictly after the last item is
//! enqueued, which is what lets the consumer stop without losing items in either completion mode.

pub mod channel;
pub mod signal;
