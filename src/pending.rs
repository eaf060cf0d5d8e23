use tokio::sync::oneshot;

use crate::error::SqlAwaitError;
use crate::raw::Completion;

/// An in-flight raw call awaiting its single completion.
///
/// Created together with the [`Completion`] handed to the raw client; the completion can only be
/// invoked once, so the operation settles exactly once.
#[must_use = "a pending operation does nothing unless settled"]
pub struct PendingOperation<T, E> {
    receiver: oneshot::Receiver<Result<T, E>>,
    operation: &'static str,
}

/// Pair a completion callback with the operation that observes it.
pub fn pending<T, E>(operation: &'static str) -> (Completion<T, E>, PendingOperation<T, E>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let done: Completion<T, E> = Box::new(move |outcome| {
        // Receiver gone means the caller stopped waiting; nothing to deliver.
        let _ = tx.send(outcome);
    });
    (
        done,
        PendingOperation {
            receiver: rx,
            operation,
        },
    )
}

impl<T, E> PendingOperation<T, E> {
    /// Wait for the raw client to report back.
    ///
    /// # Errors
    /// Returns [`SqlAwaitError::Client`] with the raw error unmodified, or
    /// [`SqlAwaitError::CallbackDropped`] if the completion was dropped without being invoked.
    pub async fn settle(self) -> Result<T, SqlAwaitError<E>> {
        match self.receiver.await {
            Ok(outcome) => outcome.map_err(SqlAwaitError::Client),
            Err(_) => Err(SqlAwaitError::CallbackDropped(self.operation)),
        }
    }

    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

impl<T, E> std::fmt::Debug for PendingOperation<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingOperation")
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}
