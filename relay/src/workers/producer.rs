use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, info_span, warn};

use crate::concurrency::channel::{BoundedChannel, PushOutcome};
use crate::concurrency::signal::CompletionSignal;
use crate::error::RelayResult;
use crate::report::{DescribeItem, Reporter, TransferEvent};
use crate::workers::base::{Worker, WorkerHandle, WorkerType};

/// Counters collected by the producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Items pushed into the channel.
    pub produced: usize,
    /// Pushes that had to wait for the consumer to free a slot.
    pub blocked_pushes: usize,
}

/// Raises the completion signal and closes the channel when the producer stops.
///
/// On the success path [`CompletionGuard::complete`] does this explicitly after the last push. If
/// the producer instead returns early or panics, dropping the guard does the same so the consumer
/// drains what is left and terminates instead of waiting forever.
struct CompletionGuard<'a, T> {
    channel: &'a BoundedChannel<T>,
    signal: &'a CompletionSignal,
    completed: bool,
}

impl<'a, T> CompletionGuard<'a, T> {
    fn new(channel: &'a BoundedChannel<T>, signal: &'a CompletionSignal) -> Self {
        Self {
            channel,
            signal,
            completed: false,
        }
    }

    fn complete(mut self) {
        self.finish();
        self.completed = true;
    }

    fn finish(&self) {
        // The signal goes up before the channel closes: a polling consumer only trusts emptiness
        // once it has seen the signal, a blocking consumer only stops once the channel is closed.
        self.signal.set();
        self.channel.close();
    }
}

impl<T> Drop for CompletionGuard<'_, T> {
    fn drop(&mut self) {
        if !self.completed {
            warn!("producer stopped before pushing every item, completing the transfer early");
            self.finish();
        }
    }
}

/// Worker pushing every source item into the channel, in order.
///
/// The producer never touches the destination. Blocking on a full channel is how back-pressure
/// slows it down to the consumer's pace.
#[derive(Debug)]
pub struct ProducerWorker<T, R> {
    source: Arc<[T]>,
    channel: Arc<BoundedChannel<T>>,
    signal: CompletionSignal,
    reporter: R,
    delay: Option<Duration>,
    describe: Option<DescribeItem<T>>,
}

impl<T, R> ProducerWorker<T, R> {
    pub fn new(
        source: Arc<[T]>,
        channel: Arc<BoundedChannel<T>>,
        signal: CompletionSignal,
        reporter: R,
        delay: Option<Duration>,
    ) -> Self {
        Self {
            source,
            channel,
            signal,
            reporter,
            delay,
            describe: None,
        }
    }

    /// Sets how items are rendered in `Produced` events.
    pub fn with_item_details(mut self, describe: Option<DescribeItem<T>>) -> Self {
        self.describe = describe;
        self
    }
}

impl<T, R> ProducerWorker<T, R>
where
    T: Clone,
    R: Reporter,
{
    fn run(self) -> RelayResult<ProducerStats> {
        let capacity = self.channel.capacity();
        let mut stats = ProducerStats::default();

        self.reporter.report(TransferEvent::Started {
            worker: WorkerType::Producer,
            items: self.source.len(),
        });

        let guard = CompletionGuard::new(&self.channel, &self.signal);

        for (position, item) in self.source.iter().enumerate() {
            if self.channel.push(item.clone())? == PushOutcome::AfterWait {
                stats.blocked_pushes += 1;
            }
            stats.produced += 1;

            self.reporter.report(TransferEvent::Produced {
                position,
                item: self.describe.map(|describe| describe(item)),
                queue_len: self.channel.len(),
                capacity,
            });

            if self.channel.is_full() {
                self.reporter.report(TransferEvent::QueueFull { capacity });
            }

            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
        }

        guard.complete();

        self.reporter.report(TransferEvent::Finished {
            worker: WorkerType::Producer,
            items: stats.produced,
        });

        Ok(stats)
    }
}

impl<T, R> Worker for ProducerWorker<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Reporter,
{
    type Stats = ProducerStats;

    fn spawn(self) -> WorkerHandle<ProducerStats> {
        let span = info_span!(
            "producer_worker",
            items = self.source.len(),
            capacity = self.channel.capacity()
        );

        let handle = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();

            let stats = self.run()?;
            info!(
                produced = stats.produced,
                blocked_pushes = stats.blocked_pushes,
                "producer worker completed successfully"
            );

            Ok(stats)
        });

        WorkerHandle::new(WorkerType::Producer, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::report::describe_debug;
    use crate::test_utils::reporter::RecordingReporter;

    #[tokio::test]
    async fn pushes_every_item_then_signals_and_closes() {
        let channel = Arc::new(BoundedChannel::new(3));
        let signal = CompletionSignal::new();
        let reporter = RecordingReporter::new();

        let mut handle = ProducerWorker::new(
            Arc::from(vec![1, 2, 3]),
            channel.clone(),
            signal.clone(),
            reporter.clone(),
            None,
        )
        .spawn();

        let stats = handle.wait().await.unwrap();
        assert_eq!(
            stats,
            ProducerStats {
                produced: 3,
                blocked_pushes: 0
            }
        );
        assert!(signal.is_set());
        assert!(channel.is_closed());
        assert_eq!(channel.recv(), Some(1));
        assert_eq!(channel.recv(), Some(2));
        assert_eq!(channel.recv(), Some(3));
        assert_eq!(channel.recv(), None);

        assert_eq!(reporter.count(|event| event.is_per_item()), 3);
        assert_eq!(
            reporter.count(|event| matches!(event, TransferEvent::QueueFull { .. })),
            1
        );
    }

    #[tokio::test]
    async fn described_items_are_attached_to_produced_events() {
        let channel = Arc::new(BoundedChannel::new(2));
        let reporter = RecordingReporter::new();

        let mut handle = ProducerWorker::new(
            Arc::from(vec![7, 8]),
            channel,
            CompletionSignal::new(),
            reporter.clone(),
            None,
        )
        .with_item_details(Some(describe_debug::<i32>))
        .spawn();

        handle.wait().await.unwrap();

        let items: Vec<Option<String>> = reporter
            .events()
            .into_iter()
            .filter_map(|event| match event {
                TransferEvent::Produced { item, .. } => Some(item),
                _ => None,
            })
            .collect();
        assert_eq!(items, vec![Some("7".to_string()), Some("8".to_string())]);
    }

    #[tokio::test]
    async fn empty_source_signals_immediately() {
        let channel = Arc::new(BoundedChannel::<u8>::new(1));
        let signal = CompletionSignal::new();

        let mut handle = ProducerWorker::new(
            Arc::from(Vec::new()),
            channel.clone(),
            signal.clone(),
            RecordingReporter::new(),
            None,
        )
        .spawn();

        assert_eq!(handle.wait().await.unwrap().produced, 0);
        assert!(signal.is_set());
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn closed_channel_stops_the_producer_and_still_signals() {
        let channel = Arc::new(BoundedChannel::new(1));
        channel.close();
        let signal = CompletionSignal::new();

        let mut handle = ProducerWorker::new(
            Arc::from(vec![1, 2]),
            channel,
            signal.clone(),
            RecordingReporter::new(),
            None,
        )
        .spawn();

        let err = handle.wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChannelClosed);
        assert!(signal.is_set());
    }
}
