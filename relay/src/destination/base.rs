use crate::error::RelayResult;

/// Sink receiving items from the consumer, in dequeue order.
///
/// The consumer is the only writer and calls [`Destination::write_item`] once per item. A failed
/// write stops the consumer and closes the channel so the producer does not block forever.
pub trait Destination<T> {
    /// Returns the name of the destination, used in logs.
    fn name() -> &'static str;

    /// Appends one item.
    fn write_item(&self, item: T) -> RelayResult<()>;
}
