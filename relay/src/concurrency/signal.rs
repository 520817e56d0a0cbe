use tokio::sync::watch;

/// One-shot flag raised by the producer once its last item is inside the channel.
///
/// [`CompletionSignal`] wraps a watch channel of `bool`. It can be cloned freely: every clone
/// observes the same flag, and reads never block.
#[derive(Debug, Clone)]
pub struct CompletionSignal(watch::Sender<bool>);

impl CompletionSignal {
    /// Creates an unset signal.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self(tx)
    }

    /// Raises the signal. Idempotent.
    ///
    /// Returns `true` if this call raised it, `false` if it was already set.
    pub fn set(&self) -> bool {
        // Works without receivers, so setting never depends on who is listening.
        self.0.send_if_modified(|set| {
            if *set {
                return false;
            }

            *set = true;
            true
        })
    }

    /// Returns whether the signal has been raised.
    pub fn is_set(&self) -> bool {
        *self.0.borrow()
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}
