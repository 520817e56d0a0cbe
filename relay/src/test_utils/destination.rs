use crate::bail;
use crate::destination::Destination;
use crate::error::{ErrorKind, RelayResult};

/// Destination rejecting every item with a [`ErrorKind::DestinationError`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingDestination;

impl<T> Destination<T> for FailingDestination {
    fn name() -> &'static str {
        "failing"
    }

    fn write_item(&self, _item: T) -> RelayResult<()> {
        bail!(ErrorKind::DestinationError, "Destination rejected item");
    }
}
