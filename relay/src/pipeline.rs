use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_config::shared::TransferConfig;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::bail;
use crate::concurrency::channel::BoundedChannel;
use crate::concurrency::signal::CompletionSignal;
use crate::destination::memory::{MemoryDestination, MemoryDestinationReader};
use crate::error::{ErrorKind, RelayError, RelayResult};
use crate::relay_error;
use crate::report::{DescribeItem, Reporter, TracingReporter, TransferEvent, describe_debug};
use crate::verify::{VerificationReport, verify};
use crate::workers::base::{Worker, WorkerHandle};
use crate::workers::consumer::{ConsumeStrategy, ConsumerStats, ConsumerWorker};
use crate::workers::producer::{ProducerStats, ProducerWorker};

/// Statistics of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferStats {
    pub producer: ProducerStats,
    pub consumer: ConsumerStats,
    /// Capacity of the channel used by the transfer.
    pub capacity: usize,
    /// Time between starting the workers and both of them completing.
    pub elapsed: Duration,
}

#[derive(Debug)]
enum TransferState {
    NotStarted,
    Started {
        producer: WorkerHandle<ProducerStats>,
        consumer: WorkerHandle<ConsumerStats>,
        /// Consumer outcome, kept until the producer is awaited too.
        consumer_result: Option<RelayResult<ConsumerStats>>,
        started_at: Instant,
    },
    Finished(TransferStats),
    Failed,
}

/// Moves a snapshot of a source sequence into an in-memory destination through a bounded channel.
///
/// A transfer runs exactly once: one producer pushes the source in order, one consumer appends
/// what it pops to the destination, and [`Transfer::wait`] resolves once both are done.
#[derive(Debug)]
pub struct Transfer<T, R = TracingReporter> {
    config: TransferConfig,
    source: Arc<[T]>,
    channel: Arc<BoundedChannel<T>>,
    signal: CompletionSignal,
    destination: MemoryDestination<T>,
    reader: MemoryDestinationReader<T>,
    reporter: R,
    describe: Option<DescribeItem<T>>,
    state: TransferState,
}

impl<T> Transfer<T, TracingReporter>
where
    T: Clone,
{
    /// Creates a transfer of a private copy of `source`, reporting through `tracing`.
    pub fn new(source: &[T], config: TransferConfig) -> RelayResult<Self> {
        Self::with_reporter(source, config, TracingReporter)
    }
}

impl<T, R> Transfer<T, R>
where
    R: Reporter,
{
    /// Creates a transfer of a private copy of `source`, reporting status events to `reporter`.
    ///
    /// Later changes to the caller's sequence never reach the transfer.
    pub fn with_reporter(source: &[T], config: TransferConfig, reporter: R) -> RelayResult<Self>
    where
        T: Clone,
    {
        config.validate()?;

        let source: Arc<[T]> = Arc::from(source);
        let channel = Arc::new(BoundedChannel::for_source(source.len()));

        reporter.report(TransferEvent::Initialized {
            items: source.len(),
            capacity: channel.capacity(),
        });

        let destination = MemoryDestination::new();

        Ok(Self {
            config,
            source,
            channel,
            signal: CompletionSignal::new(),
            reader: destination.reader(),
            destination,
            reporter,
            describe: None,
            state: TransferState::NotStarted,
        })
    }

    /// Renders items with their [`fmt::Debug`] representation in `Produced` and `Consumed` events.
    pub fn with_item_details(mut self) -> Self
    where
        T: fmt::Debug,
    {
        self.describe = Some(describe_debug::<T>);
        self
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Returns the capacity of the channel between the workers.
    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }

    /// Returns the source snapshot taken at construction.
    pub fn source(&self) -> &[T] {
        &self.source
    }

    /// Returns a read-only view of the destination the consumer writes into.
    ///
    /// Reading it while the transfer runs yields a consistent prefix of the source.
    pub fn destination(&self) -> &MemoryDestinationReader<T> {
        &self.reader
    }

    /// Returns the statistics of the transfer once it completed successfully.
    pub fn stats(&self) -> Option<&TransferStats> {
        match &self.state {
            TransferState::Finished(stats) => Some(stats),
            _ => None,
        }
    }

    /// Verifies that the destination is an exact, order-preserving copy of the source.
    pub fn verify(&self) -> VerificationReport
    where
        T: Ord,
    {
        let report = self
            .reader
            .with_items(|items| verify(&self.source, items));

        if report.passed() {
            info!(
                source_len = report.source_len(),
                destination_len = report.destination_len(),
                "transfer verification passed"
            );
        } else {
            for check in report.failed_checks() {
                warn!(check = check.name(), "transfer verification check failed");
            }
        }

        report
    }
}

impl<T, R> Transfer<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: Reporter,
{
    /// Starts the consumer and then the producer.
    ///
    /// Must be called from within a tokio runtime, since both workers run on its blocking pool.
    pub fn start(&mut self) -> RelayResult<()> {
        if !matches!(self.state, TransferState::NotStarted) {
            bail!(
                ErrorKind::InvalidState,
                "Transfer was already started",
                "a transfer can only run once, create a new one to transfer again"
            );
        }

        Handle::try_current().map_err(|err| {
            relay_error!(
                ErrorKind::InvalidState,
                "Transfer must be started within a tokio runtime",
                source: err
            )
        })?;

        info!(
            items = self.source.len(),
            capacity = self.channel.capacity(),
            completion = ?self.config.completion,
            "starting transfer"
        );

        let started_at = Instant::now();

        // The consumer goes first so it is already waiting when the first item lands.
        let consumer = ConsumerWorker::new(
            self.channel.clone(),
            self.signal.clone(),
            self.destination.clone(),
            self.reporter.clone(),
            ConsumeStrategy::from(&self.config),
            self.source.len(),
            self.config.consumer_delay(),
        )
        .with_item_details(self.describe)
        .spawn();

        let producer = ProducerWorker::new(
            self.source.clone(),
            self.channel.clone(),
            self.signal.clone(),
            self.reporter.clone(),
            self.config.producer_delay(),
        )
        .with_item_details(self.describe)
        .spawn();

        self.state = TransferState::Started {
            producer,
            consumer,
            consumer_result: None,
            started_at,
        };

        Ok(())
    }

    /// Waits for both workers to finish and returns the transfer statistics.
    ///
    /// Failures of both workers are returned together as an aggregated [`RelayError`], the
    /// consumer's first since a consumer failure is what makes a blocked producer fail.
    ///
    /// Cancel-safe: if the returned future is dropped, a later call resumes waiting where this
    /// one stopped.
    pub async fn wait(&mut self) -> RelayResult<TransferStats> {
        let (producer, consumer, consumer_result, started_at) = match &mut self.state {
            TransferState::NotStarted => {
                bail!(ErrorKind::InvalidState, "Transfer was not started");
            }
            TransferState::Failed => {
                bail!(ErrorKind::InvalidState, "Transfer already failed");
            }
            TransferState::Finished(stats) => return Ok(*stats),
            TransferState::Started {
                producer,
                consumer,
                consumer_result,
                started_at,
            } => (producer, consumer, consumer_result, *started_at),
        };

        info!("waiting for producer and consumer workers to complete");

        if consumer_result.is_none() {
            *consumer_result = Some(consumer.wait().await);
        }
        let producer_result = producer.wait().await;

        let Some(consumer_result) = consumer_result.take() else {
            bail!(ErrorKind::InvalidState, "Consumer result is missing");
        };

        match (producer_result, consumer_result) {
            (Ok(producer), Ok(consumer)) => {
                let stats = TransferStats {
                    producer,
                    consumer,
                    capacity: self.channel.capacity(),
                    elapsed: started_at.elapsed(),
                };

                info!(
                    produced = stats.producer.produced,
                    consumed = stats.consumer.consumed,
                    blocked_pushes = stats.producer.blocked_pushes,
                    empty_waits = stats.consumer.empty_waits,
                    elapsed = ?stats.elapsed,
                    "transfer completed"
                );

                self.state = TransferState::Finished(stats);

                Ok(stats)
            }
            (producer_result, consumer_result) => {
                let errors: Vec<RelayError> = [consumer_result.err(), producer_result.err()]
                    .into_iter()
                    .flatten()
                    .collect();

                error!(
                    failed_workers = errors.len(),
                    stored = self.reader.len(),
                    "transfer failed"
                );

                self.state = TransferState::Failed;

                Err(errors.into())
            }
        }
    }

    /// Starts the transfer and waits for it to complete.
    pub async fn run(&mut self) -> RelayResult<TransferStats> {
        self.start()?;
        self.wait().await
    }
}

#[cfg(test)]
mod tests {
    use relay_config::shared::CompletionMode;

    use super::*;
    use crate::test_utils::reporter::RecordingReporter;
    use crate::workers::base::WorkerType;

    /// Stalls the producer thread after its last push, so the consumer completes first.
    #[derive(Debug, Clone, Copy)]
    struct SlowProducerFinish;

    impl Reporter for SlowProducerFinish {
        fn report(&self, event: TransferEvent) {
            if let TransferEvent::Finished {
                worker: WorkerType::Producer,
                ..
            } = event
            {
                std::thread::sleep(Duration::from_millis(300));
            }
        }
    }

    fn poll_config() -> TransferConfig {
        TransferConfig {
            completion: CompletionMode::Poll,
            poll_interval_ms: 5,
            ..TransferConfig::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_copies_the_source_in_order() {
        let mut transfer = Transfer::new(&[1, 2, 3, 4, 5], TransferConfig::default()).unwrap();
        assert_eq!(transfer.capacity(), 2);

        let stats = transfer.run().await.unwrap();

        assert_eq!(transfer.destination().items(), vec![1, 2, 3, 4, 5]);
        assert_eq!(stats.producer.produced, 5);
        assert_eq!(stats.consumer.consumed, 5);
        assert_eq!(transfer.stats(), Some(&stats));
        assert!(transfer.verify().passed());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn polling_mode_copies_the_source_in_order() {
        let source: Vec<u32> = (0..12).collect();
        let mut transfer = Transfer::new(&source, poll_config()).unwrap();

        transfer.run().await.unwrap();

        assert_eq!(transfer.destination().items(), source);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn initialization_is_reported_at_construction() {
        let reporter = RecordingReporter::new();
        let _transfer =
            Transfer::with_reporter(&[1, 2, 3, 4], TransferConfig::default(), reporter.clone())
                .unwrap();

        assert_eq!(
            reporter.events(),
            vec![TransferEvent::Initialized {
                items: 4,
                capacity: 2
            }]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn running_twice_is_an_invalid_state() {
        let mut transfer = Transfer::new(&[1], TransferConfig::default()).unwrap();
        transfer.run().await.unwrap();

        let err = transfer.run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(transfer.destination().items(), vec![1]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wait_resumes_after_being_cancelled() {
        let mut transfer =
            Transfer::with_reporter(&[1, 2, 3], TransferConfig::default(), SlowProducerFinish)
                .unwrap();
        transfer.start().unwrap();

        // The deadline hits once the consumer is done but while the producer is still stalled.
        let interrupted = tokio::time::timeout(Duration::from_millis(100), transfer.wait()).await;
        assert!(interrupted.is_err());

        let stats = transfer.wait().await.unwrap();
        assert_eq!(stats.consumer.consumed, 3);
        assert_eq!(stats.producer.produced, 3);
        assert_eq!(transfer.destination().items(), vec![1, 2, 3]);
        assert!(stats.elapsed >= Duration::from_millis(300));
        assert_eq!(transfer.stats().map(|stats| stats.elapsed), Some(stats.elapsed));
    }

    #[tokio::test]
    async fn waiting_before_starting_is_an_invalid_state() {
        let mut transfer = Transfer::new(&[1], TransferConfig::default()).unwrap();

        let err = transfer.wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn starting_outside_a_runtime_fails() {
        let mut transfer = Transfer::new(&[1], TransferConfig::default()).unwrap();

        let err = transfer.start().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = TransferConfig {
            poll_interval_ms: 0,
            ..poll_config()
        };

        let err = Transfer::new(&[1], config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }
}
