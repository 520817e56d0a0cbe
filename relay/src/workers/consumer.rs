use std::sync::Arc;
use std::thread;
use std::time::Duration;

use relay_config::shared::{CompletionMode, TransferConfig};
use tracing::{debug, info, info_span};

use crate::concurrency::channel::{BoundedChannel, Pop};
use crate::concurrency::signal::CompletionSignal;
use crate::destination::Destination;
use crate::error::RelayResult;
use crate::report::{DescribeItem, Reporter, TransferEvent};
use crate::workers::base::{Worker, WorkerHandle, WorkerType};

/// Counters collected by the consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Items written to the destination.
    pub consumed: usize,
    /// Times the channel was found empty right after a pop.
    pub empty_waits: usize,
    /// Timed pops that returned without an item.
    pub idle_polls: usize,
}

/// How the consumer waits for items and decides it is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeStrategy {
    /// Block until an item arrives or the producer closes the channel.
    UntilClosed,
    /// Pop with `interval` as timeout; after an idle pop, stop once the completion signal is set
    /// and the channel is empty.
    Poll { interval: Duration },
}

impl From<&TransferConfig> for ConsumeStrategy {
    fn from(config: &TransferConfig) -> Self {
        match config.completion {
            CompletionMode::Close => ConsumeStrategy::UntilClosed,
            CompletionMode::Poll => ConsumeStrategy::Poll {
                interval: config.poll_interval(),
            },
        }
    }
}

/// Closes the channel when the consumer exits.
///
/// After a normal exit the producer has already closed it. After an error or panic this unblocks
/// a producer waiting on a full channel, which then fails with a closed-channel error.
struct HangUpOnDrop<'a, T>(&'a BoundedChannel<T>);

impl<T> Drop for HangUpOnDrop<'_, T> {
    fn drop(&mut self) {
        if self.0.close() {
            debug!("consumer closed the channel on exit");
        }
    }
}

/// Worker draining the channel into the destination, in dequeue order.
#[derive(Debug)]
pub struct ConsumerWorker<T, D, R> {
    channel: Arc<BoundedChannel<T>>,
    signal: CompletionSignal,
    destination: D,
    reporter: R,
    strategy: ConsumeStrategy,
    expected_items: usize,
    delay: Option<Duration>,
    describe: Option<DescribeItem<T>>,
}

impl<T, D, R> ConsumerWorker<T, D, R> {
    pub fn new(
        channel: Arc<BoundedChannel<T>>,
        signal: CompletionSignal,
        destination: D,
        reporter: R,
        strategy: ConsumeStrategy,
        expected_items: usize,
        delay: Option<Duration>,
    ) -> Self {
        Self {
            channel,
            signal,
            destination,
            reporter,
            strategy,
            expected_items,
            delay,
            describe: None,
        }
    }

    /// Sets how items are rendered in `Consumed` events.
    pub fn with_item_details(mut self, describe: Option<DescribeItem<T>>) -> Self {
        self.describe = describe;
        self
    }
}

impl<T, D, R> ConsumerWorker<T, D, R>
where
    D: Destination<T>,
    R: Reporter,
{
    fn run(self) -> RelayResult<ConsumerStats> {
        let _hang_up = HangUpOnDrop(&self.channel);
        let mut stats = ConsumerStats::default();

        self.reporter.report(TransferEvent::Started {
            worker: WorkerType::Consumer,
            items: self.expected_items,
        });

        while let Some(item) = self.next_item(&mut stats) {
            let description = self.describe.map(|describe| describe(&item));
            self.destination.write_item(item)?;
            stats.consumed += 1;

            self.reporter.report(TransferEvent::Consumed {
                position: stats.consumed - 1,
                item: description,
                total: self.expected_items,
            });

            if self.channel.is_empty() {
                stats.empty_waits += 1;
                self.reporter.report(TransferEvent::QueueEmpty);
            }

            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
        }

        self.reporter.report(TransferEvent::Finished {
            worker: WorkerType::Consumer,
            items: stats.consumed,
        });

        Ok(stats)
    }

    /// Returns the next item, or [`None`] once the producer is done and the channel is drained.
    fn next_item(&self, stats: &mut ConsumerStats) -> Option<T> {
        match self.strategy {
            ConsumeStrategy::UntilClosed => self.channel.recv(),
            ConsumeStrategy::Poll { interval } => loop {
                match self.channel.pop(interval) {
                    Pop::Item(item) => return Some(item),
                    Pop::NotYet => {
                        stats.idle_polls += 1;

                        // The producer raises the signal only after its last push, so an empty
                        // channel observed after the signal stays empty.
                        if self.signal.is_set() && self.channel.is_empty() {
                            return None;
                        }
                    }
                }
            },
        }
    }
}

impl<T, D, R> Worker for ConsumerWorker<T, D, R>
where
    T: Send + 'static,
    D: Destination<T> + Send + 'static,
    R: Reporter,
{
    type Stats = ConsumerStats;

    fn spawn(self) -> WorkerHandle<ConsumerStats> {
        let span = info_span!(
            "consumer_worker",
            destination = D::name(),
            capacity = self.channel.capacity()
        );

        let handle = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();

            let stats = self.run()?;
            info!(
                consumed = stats.consumed,
                empty_waits = stats.empty_waits,
                idle_polls = stats.idle_polls,
                "consumer worker completed successfully"
            );

            Ok(stats)
        });

        WorkerHandle::new(WorkerType::Consumer, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::memory::MemoryDestination;
    use crate::error::ErrorKind;
    use crate::test_utils::destination::FailingDestination;
    use crate::test_utils::reporter::RecordingReporter;

    fn consumer<D: Destination<u32>>(
        channel: &Arc<BoundedChannel<u32>>,
        signal: &CompletionSignal,
        destination: D,
        strategy: ConsumeStrategy,
    ) -> ConsumerWorker<u32, D, RecordingReporter> {
        ConsumerWorker::new(
            channel.clone(),
            signal.clone(),
            destination,
            RecordingReporter::new(),
            strategy,
            3,
            None,
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn drains_until_the_channel_is_closed() {
        let channel = Arc::new(BoundedChannel::new(3));
        let signal = CompletionSignal::new();
        let destination = MemoryDestination::new();

        let mut handle = consumer(
            &channel,
            &signal,
            destination.clone(),
            ConsumeStrategy::UntilClosed,
        )
        .spawn();

        for i in 0..3 {
            channel.push(i).unwrap();
        }
        signal.set();
        channel.close();

        let stats = handle.wait().await.unwrap();
        assert_eq!(stats.consumed, 3);
        assert_eq!(stats.idle_polls, 0);
        assert_eq!(destination.reader().items(), vec![0, 1, 2]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn polling_stops_only_after_signal_and_drain() {
        let channel = Arc::new(BoundedChannel::new(3));
        let signal = CompletionSignal::new();
        let destination = MemoryDestination::new();

        // Items are already queued when the signal goes up; they must all still arrive.
        for i in 0..3 {
            channel.push(i).unwrap();
        }
        signal.set();

        let mut handle = consumer(
            &channel,
            &signal,
            destination.clone(),
            ConsumeStrategy::Poll {
                interval: Duration::from_millis(10),
            },
        )
        .spawn();

        let stats = handle.wait().await.unwrap();
        assert_eq!(stats.consumed, 3);
        assert!(stats.idle_polls >= 1);
        assert_eq!(destination.reader().items(), vec![0, 1, 2]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn polling_keeps_waiting_while_the_signal_is_unset() {
        let channel = Arc::new(BoundedChannel::new(1));
        let signal = CompletionSignal::new();
        let destination = MemoryDestination::new();

        let mut handle = consumer(
            &channel,
            &signal,
            destination.clone(),
            ConsumeStrategy::Poll {
                interval: Duration::from_millis(5),
            },
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        channel.push(9).unwrap();
        signal.set();

        let stats = handle.wait().await.unwrap();
        assert_eq!(stats.consumed, 1);
        assert!(stats.idle_polls >= 2);
        assert_eq!(destination.reader().items(), vec![9]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn destination_failure_stops_the_consumer_and_closes_the_channel() {
        let channel = Arc::new(BoundedChannel::new(3));
        let signal = CompletionSignal::new();

        channel.push(1).unwrap();

        let mut handle = consumer(
            &channel,
            &signal,
            FailingDestination,
            ConsumeStrategy::UntilClosed,
        )
        .spawn();

        let err = handle.wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DestinationError);
        assert!(channel.is_closed());
    }

    #[test]
    fn strategy_follows_the_configured_completion_mode() {
        let mut config = TransferConfig::default();
        assert_eq!(
            ConsumeStrategy::from(&config),
            ConsumeStrategy::UntilClosed
        );

        config.completion = CompletionMode::Poll;
        config.poll_interval_ms = 25;
        assert_eq!(
            ConsumeStrategy::from(&config),
            ConsumeStrategy::Poll {
                interval: Duration::from_millis(25)
            }
        );
    }
}
