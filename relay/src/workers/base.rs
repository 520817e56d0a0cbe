use std::any::Any;
use std::fmt;

use tokio::task::{JoinError, JoinHandle};
use tracing::error;

use crate::error::{ErrorKind, RelayError, RelayResult};
use crate::{bail, relay_error};

/// The two kinds of worker taking part in a transfer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WorkerType {
    /// Worker pushing source items into the channel.
    Producer,
    /// Worker draining the channel into the destination.
    Consumer,
}

impl WorkerType {
    pub fn name(&self) -> &'static str {
        match self {
            WorkerType::Producer => "Producer",
            WorkerType::Consumer => "Consumer",
        }
    }

    /// Maps a failed join of this worker's thread to a [`RelayError`].
    fn join_error(&self, err: JoinError) -> RelayError {
        if err.is_cancelled() {
            return match self {
                WorkerType::Producer => relay_error!(
                    ErrorKind::ProducerWorkerCancelled,
                    "Producer worker was cancelled"
                ),
                WorkerType::Consumer => relay_error!(
                    ErrorKind::ConsumerWorkerCancelled,
                    "Consumer worker was cancelled"
                ),
            };
        }

        let message = match err.try_into_panic() {
            Ok(payload) => panic_message(payload.as_ref()),
            Err(err) => err.to_string(),
        };

        match self {
            WorkerType::Producer => relay_error!(
                ErrorKind::ProducerWorkerPanic,
                "Producer worker panicked",
                detail = message
            ),
            WorkerType::Consumer => relay_error!(
                ErrorKind::ConsumerWorkerPanic,
                "Consumer worker panicked",
                detail = message
            ),
        }
    }
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Extracts the message of a panic payload, if it carries one.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }

    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }

    "panic payload is not a string".to_string()
}

/// Worker that runs on its own thread once spawned.
///
/// Spawning must happen inside a tokio runtime: workers run on the runtime's blocking pool since
/// both of them block on the channel.
pub trait Worker {
    /// Statistics returned by the worker when it completes successfully.
    type Stats: Send + 'static;

    /// Starts the worker and returns a handle for awaiting its completion.
    fn spawn(self) -> WorkerHandle<Self::Stats>;
}

/// Handle for awaiting a running worker.
///
/// Awaiting through [`WorkerHandle::wait`] is cancel-safe: if the waiting future is dropped, the
/// handle keeps the worker and can be awaited again.
#[derive(Debug)]
pub struct WorkerHandle<S> {
    worker_type: WorkerType,
    handle: Option<JoinHandle<RelayResult<S>>>,
}

impl<S> WorkerHandle<S> {
    pub(crate) fn new(worker_type: WorkerType, handle: JoinHandle<RelayResult<S>>) -> Self {
        Self {
            worker_type,
            handle: Some(handle),
        }
    }

    pub fn worker_type(&self) -> WorkerType {
        self.worker_type
    }

    /// Returns whether the worker thread has finished.
    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    /// Waits for the worker to complete and returns its statistics.
    ///
    /// A panic inside the worker is reported as a `*WorkerPanic` error carrying the panic message.
    pub async fn wait(&mut self) -> RelayResult<S> {
        let Some(handle) = self.handle.as_mut() else {
            bail!(
                ErrorKind::InvalidState,
                "Worker was already awaited",
                self.worker_type
            );
        };

        let result = handle.await;
        self.handle = None;

        match result {
            Ok(result) => result,
            Err(err) => {
                let err = self.worker_type.join_error(err);
                error!(worker = %self.worker_type, "worker terminated abnormally: {err}");

                Err(err)
            }
        }
    }
}
