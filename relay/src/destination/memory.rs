use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::destination::Destination;
use crate::error::RelayResult;

type SharedItems<T> = Arc<Mutex<Vec<T>>>;

/// Locks the storage, recovering from poisoning since a push never leaves a partial element.
fn lock<T>(items: &SharedItems<T>) -> MutexGuard<'_, Vec<T>> {
    items.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory destination accumulating transferred items in order.
///
/// Clones share the same storage and can all write, so a clone is only handed to the consumer.
/// Everyone else reads through a [`MemoryDestinationReader`]. Every append and every read happens
/// under the same mutex, so a reader never observes a partial append even while the consumer is
/// still running.
#[derive(Debug)]
pub struct MemoryDestination<T> {
    items: SharedItems<T>,
}

impl<T> MemoryDestination<T> {
    /// Creates an empty destination.
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a read-only handle on the same storage.
    pub fn reader(&self) -> MemoryDestinationReader<T> {
        MemoryDestinationReader {
            items: self.items.clone(),
        }
    }
}

impl<T> Clone for MemoryDestination<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

impl<T> Default for MemoryDestination<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Destination<T> for MemoryDestination<T> {
    fn name() -> &'static str {
        "memory"
    }

    fn write_item(&self, item: T) -> RelayResult<()> {
        let mut items = lock(&self.items);
        items.push(item);

        debug!(stored = items.len(), "item written to memory destination");

        Ok(())
    }
}

/// Read-only view of a [`MemoryDestination`].
///
/// Observes every item written so far, in order, and offers no way to modify them.
#[derive(Debug)]
pub struct MemoryDestinationReader<T> {
    items: SharedItems<T>,
}

impl<T> MemoryDestinationReader<T> {
    /// Returns a copy of the items received so far.
    pub fn items(&self) -> Vec<T>
    where
        T: Clone,
    {
        lock(&self.items).clone()
    }

    /// Runs `f` against the received items while holding the lock.
    pub fn with_items<F, O>(&self, f: F) -> O
    where
        F: FnOnce(&[T]) -> O,
    {
        f(&lock(&self.items))
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }
}

impl<T> Clone for MemoryDestinationReader<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_observe_writes_of_every_clone() {
        let destination = MemoryDestination::new();
        let reader = destination.reader();
        let writer = destination.clone();

        assert!(reader.is_empty());

        writer.write_item(1).unwrap();
        destination.write_item(2).unwrap();

        assert_eq!(reader.items(), vec![1, 2]);
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.with_items(|items| items.iter().sum::<i32>()), 3);
    }

    #[test]
    fn reader_clones_share_the_view() {
        let destination = MemoryDestination::new();
        let reader = destination.reader().clone();

        destination.write_item("x").unwrap();

        assert_eq!(reader.items(), vec!["x"]);
    }
}
