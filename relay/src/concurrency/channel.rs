//! Fixed-capacity blocking FIFO channel shared by the producer and the consumer.
//!
//! [`BoundedChannel`] keeps its items behind a single mutex and uses two condition variables, one
//! waking producers when space frees up and one waking consumers when an item arrives or the
//! channel closes. Every wait loops on its predicate, so spurious wakeups are harmless.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::bail;
use crate::error::{ErrorKind, RelayResult};

/// Returns the channel capacity used for a source of `source_len` items.
///
/// The capacity is half of the source, rounded down, and never less than one so that even an
/// empty or single-item source gets a usable channel.
pub fn channel_capacity(source_len: usize) -> usize {
    (source_len / 2).max(1)
}

/// Result of a timed [`BoundedChannel::pop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pop<T> {
    /// The head item, removed from the channel.
    Item(T),
    /// No item arrived before the timeout elapsed.
    NotYet,
}

/// How a successful [`BoundedChannel::push`] obtained its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Free capacity was available immediately.
    Immediate,
    /// The channel was full and the caller blocked until the consumer made room.
    AfterWait,
}

#[derive(Debug)]
struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A bounded, closable, blocking FIFO queue.
///
/// The channel never holds more than [`BoundedChannel::capacity`] items and hands them out in the
/// order they were pushed. Once closed, pushes fail while pops keep draining whatever is left.
#[derive(Debug)]
pub struct BoundedChannel<T> {
    inner: Mutex<Inner<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BoundedChannel<T> {
    /// Creates a channel holding at most `capacity` items, clamping zero to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Creates a channel sized for a source of `source_len` items.
    pub fn for_source(source_len: usize) -> Self {
        Self::new(channel_capacity(source_len))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Inserts `item` at the tail, blocking while the channel is full.
    ///
    /// Returns an [`ErrorKind::ChannelClosed`] error if the channel is closed before the item could
    /// be inserted; the item is dropped in that case.
    pub fn push(&self, item: T) -> RelayResult<PushOutcome> {
        let mut inner = self.lock();

        let mut outcome = PushOutcome::Immediate;
        while inner.items.len() >= self.capacity && !inner.closed {
            outcome = PushOutcome::AfterWait;
            inner = self
                .not_full
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if inner.closed {
            bail!(
                ErrorKind::ChannelClosed,
                "Cannot push into a closed channel"
            );
        }

        inner.items.push_back(item);
        drop(inner);
        self.not_empty.notify_one();

        Ok(outcome)
    }

    /// Removes the head item, waiting at most `timeout` for one to arrive.
    ///
    /// An elapsed timeout is a normal outcome reported as [`Pop::NotYet`]. A closed and drained
    /// channel also reports [`Pop::NotYet`], immediately.
    pub fn pop(&self, timeout: Duration) -> Pop<T> {
        let inner = self.lock();
        let (mut inner, _) = self
            .not_empty
            .wait_timeout_while(inner, timeout, |inner| {
                inner.items.is_empty() && !inner.closed
            })
            .unwrap_or_else(PoisonError::into_inner);

        match inner.items.pop_front() {
            Some(item) => {
                drop(inner);
                self.not_full.notify_one();
                Pop::Item(item)
            }
            None => Pop::NotYet,
        }
    }

    /// Removes the head item, waiting until one arrives or the channel is closed.
    ///
    /// Returns [`None`] only once the channel is closed and every item has been drained, so a
    /// consumer looping on this method observes every pushed item.
    pub fn recv(&self) -> Option<T> {
        let inner = self.lock();
        let mut inner = self
            .not_empty
            .wait_while(inner, |inner| inner.items.is_empty() && !inner.closed)
            .unwrap_or_else(PoisonError::into_inner);

        let item = inner.items.pop_front()?;
        drop(inner);
        self.not_full.notify_one();

        Some(item)
    }

    /// Closes the channel, waking every blocked caller. Closing twice is a no-op.
    ///
    /// Returns `true` if this call closed the channel.
    pub fn close(&self) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            return false;
        }

        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();

        true
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Snapshot of the number of queued items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Snapshot emptiness check.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Snapshot fullness check.
    pub fn is_full(&self) -> bool {
        self.lock().items.len() >= self.capacity
    }

    /// Locks the queue state.
    ///
    /// No user code runs while the lock is held, so a poisoned lock still guards a consistent
    /// queue and is recovered.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use super::*;

    #[test]
    fn capacity_is_half_the_source_and_at_least_one() {
        assert_eq!(channel_capacity(10), 5);
        assert_eq!(channel_capacity(15), 7);
        assert_eq!(channel_capacity(20), 10);
        assert_eq!(channel_capacity(5), 2);
        assert_eq!(channel_capacity(1), 1);
        assert_eq!(channel_capacity(0), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(BoundedChannel::<u8>::new(0).capacity(), 1);
    }

    #[test]
    fn items_leave_in_insertion_order() {
        let channel = BoundedChannel::new(3);
        for i in 0..3 {
            assert_eq!(channel.push(i).unwrap(), PushOutcome::Immediate);
        }

        assert!(channel.is_full());
        assert_eq!(channel.len(), 3);

        for i in 0..3 {
            assert_eq!(channel.pop(Duration::from_millis(10)), Pop::Item(i));
        }
        assert!(channel.is_empty());
    }

    #[test]
    fn pop_on_empty_channel_times_out_with_not_yet() {
        let channel = BoundedChannel::<u32>::new(1);

        let started = Instant::now();
        assert_eq!(channel.pop(Duration::from_millis(20)), Pop::NotYet);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn push_blocks_until_the_consumer_makes_room() {
        let channel = Arc::new(BoundedChannel::new(1));
        channel.push(1).unwrap();

        let producer = {
            let channel = channel.clone();
            thread::spawn(move || channel.push(2).unwrap())
        };

        // Give the producer time to block on the full channel.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(channel.len(), 1);
        assert_eq!(channel.pop(Duration::from_secs(1)), Pop::Item(1));

        assert_eq!(producer.join().unwrap(), PushOutcome::AfterWait);
        assert_eq!(channel.pop(Duration::from_secs(1)), Pop::Item(2));
    }

    #[test]
    fn recv_drains_remaining_items_after_close() {
        let channel = BoundedChannel::new(2);
        channel.push("a").unwrap();
        channel.push("b").unwrap();

        assert!(channel.close());
        assert!(!channel.close());
        assert!(channel.is_closed());

        assert_eq!(channel.recv(), Some("a"));
        assert_eq!(channel.recv(), Some("b"));
        assert_eq!(channel.recv(), None);
    }

    #[test]
    fn recv_wakes_up_when_the_channel_is_closed() {
        let channel = Arc::new(BoundedChannel::<u8>::new(1));

        let consumer = {
            let channel = channel.clone();
            thread::spawn(move || channel.recv())
        };

        thread::sleep(Duration::from_millis(20));
        channel.close();

        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn pop_on_closed_and_drained_channel_returns_immediately() {
        let channel = BoundedChannel::<u8>::new(1);
        channel.close();

        let started = Instant::now();
        assert_eq!(channel.pop(Duration::from_secs(5)), Pop::NotYet);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn push_into_closed_channel_fails() {
        let channel = BoundedChannel::new(1);
        channel.close();

        let err = channel.push(1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChannelClosed);
    }

    #[test]
    fn blocked_push_fails_when_the_channel_is_closed() {
        let channel = Arc::new(BoundedChannel::new(1));
        channel.push(1).unwrap();

        let producer = {
            let channel = channel.clone();
            thread::spawn(move || channel.push(2))
        };

        thread::sleep(Duration::from_millis(20));
        channel.close();

        let err = producer.join().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChannelClosed);
        assert_eq!(channel.len(), 1);
    }
}
