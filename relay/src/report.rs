//! Status events emitted while a transfer runs.
//!
//! Workers describe what they are doing through [`TransferEvent`]s handed to a [`Reporter`]. The
//! reporter decides how events are rendered; [`TracingReporter`] turns them into `tracing` events.

use std::fmt;

use tracing::{debug, info};

use crate::workers::base::WorkerType;

/// A discrete status event of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// The transfer was constructed.
    Initialized { items: usize, capacity: usize },
    /// A worker started its loop.
    Started { worker: WorkerType, items: usize },
    /// The producer pushed the item at `position` of the source.
    ///
    /// `item` holds the rendered item when the transfer describes items.
    Produced {
        position: usize,
        item: Option<String>,
        queue_len: usize,
        capacity: usize,
    },
    /// The channel was full right after a push, so the next push will block.
    QueueFull { capacity: usize },
    /// The consumer stored the item at `position` of the destination.
    Consumed {
        position: usize,
        item: Option<String>,
        total: usize,
    },
    /// The channel was empty right after a pop, so the consumer will wait for the producer.
    QueueEmpty,
    /// A worker left its loop after handling `items` items.
    Finished { worker: WorkerType, items: usize },
}

impl TransferEvent {
    /// Returns the name of the component the event is about.
    pub fn actor(&self) -> &'static str {
        match self {
            TransferEvent::Initialized { .. } => "Transfer",
            TransferEvent::Started { worker, .. } | TransferEvent::Finished { worker, .. } => {
                worker.name()
            }
            TransferEvent::Produced { .. } | TransferEvent::QueueFull { .. } => {
                WorkerType::Producer.name()
            }
            TransferEvent::Consumed { .. } | TransferEvent::QueueEmpty => {
                WorkerType::Consumer.name()
            }
        }
    }

    /// Returns whether the event is emitted once per item.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            TransferEvent::Produced { .. } | TransferEvent::Consumed { .. }
        )
    }

    fn action(&self) -> &'static str {
        match self {
            TransferEvent::Initialized { .. } => "Initialized",
            TransferEvent::Started { .. } => "Starting",
            TransferEvent::Produced { .. } => "Produced",
            TransferEvent::QueueFull { .. } => "Queue FULL - blocking until space available",
            TransferEvent::Consumed { .. } => "Consumed",
            TransferEvent::QueueEmpty => "Queue EMPTY - waiting for producer",
            TransferEvent::Finished { .. } => "Finished",
        }
    }

    fn details(&self) -> String {
        match self {
            TransferEvent::Initialized { items, capacity } => {
                format!("{items} items, queue capacity: {capacity}")
            }
            TransferEvent::Started { items, .. } => format!("{items} items"),
            TransferEvent::Produced {
                position,
                item,
                queue_len,
                capacity,
            } => format!(
                "{} (Queue: {queue_len}/{capacity})",
                item_label(*position, item.as_deref())
            ),
            TransferEvent::Consumed {
                position,
                item,
                total,
            } => format!(
                "{} (Destination: {}/{total})",
                item_label(*position, item.as_deref()),
                position + 1
            ),
            TransferEvent::Finished { items, .. } => format!("{items} items"),
            TransferEvent::QueueFull { .. } | TransferEvent::QueueEmpty => String::new(),
        }
    }
}

impl fmt::Display for TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_status(self.actor(), self.action(), &self.details()))
    }
}

/// Renders an item for status events.
pub type DescribeItem<T> = fn(&T) -> String;

/// Describes an item through its [`fmt::Debug`] representation.
pub fn describe_debug<T: fmt::Debug>(item: &T) -> String {
    format!("{item:?}")
}

fn item_label(position: usize, item: Option<&str>) -> String {
    match item {
        Some(item) => item.to_string(),
        None => format!("item #{position}"),
    }
}

/// Renders a status line as `[actor] action: details`, omitting the suffix when `details` is empty.
pub fn format_status(actor: &str, action: &str, details: &str) -> String {
    if details.is_empty() {
        format!("[{actor}] {action}")
    } else {
        format!("[{actor}] {action}: {details}")
    }
}

/// Receives the status events of a transfer.
///
/// Reporters are cloned into both workers and called from their threads, so implementations must
/// be cheap to clone and safe to call concurrently.
pub trait Reporter: Clone + Send + Sync + 'static {
    fn report(&self, event: TransferEvent);
}

/// Reporter logging every event through `tracing`.
///
/// Per-item events are logged at `debug` level, everything else at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: TransferEvent) {
        if event.is_per_item() {
            debug!(actor = event.actor(), "{event}");
        } else {
            info!(actor = event.actor(), "{event}");
        }
    }
}
