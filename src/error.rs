use thiserror::Error;

/// Error surfaced by every awaitable operation.
///
/// The raw client's error is carried as-is in [`SqlAwaitError::Client`]; this layer never wraps,
/// annotates, or translates it. The only error originated here is a completion that was dropped
/// by the raw client without ever being invoked.
#[derive(Debug, Error)]
pub enum SqlAwaitError<E> {
    #[error(transparent)]
    Client(E),

    #[error("{0} completion was dropped before it fired")]
    CallbackDropped(&'static str),
}

impl<E> SqlAwaitError<E> {
    /// Borrow the raw client error, if this failure came from the client.
    #[must_use]
    pub fn client(&self) -> Option<&E> {
        match self {
            Self::Client(err) => Some(err),
            Self::CallbackDropped(_) => None,
        }
    }

    /// Take ownership of the raw client error, if this failure came from the client.
    pub fn into_client(self) -> Option<E> {
        match self {
            Self::Client(err) => Some(err),
            Self::CallbackDropped(_) => None,
        }
    }

    #[must_use]
    pub fn is_callback_dropped(&self) -> bool {
        matches!(self, Self::CallbackDropped(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("boom: {0}")]
    struct Boom(u32);

    #[test]
    fn client_error_display_is_transparent() {
        let err: SqlAwaitError<Boom> = SqlAwaitError::Client(Boom(7));
        assert_eq!(err.to_string(), "boom: 7");
        assert_eq!(err.client(), Some(&Boom(7)));
        assert_eq!(err.into_client(), Some(Boom(7)));
    }

    #[test]
    fn dropped_completion_names_operation() {
        let err: SqlAwaitError<Boom> = SqlAwaitError::CallbackDropped("commit");
        assert!(err.is_callback_dropped());
        assert_eq!(err.to_string(), "commit completion was dropped before it fired");
        assert!(err.client().is_none());
    }
}
