/// Whether a connection currently has a transaction open.
///
/// Only a successful begin opens it. Commit, compensating rollback, and connection teardown close
/// it. Queries and `change_user` never touch it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionState {
    open: bool,
}

impl TransactionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_open(self) -> bool {
        self.open
    }

    /// Record a successful begin.
    pub fn begin(&mut self) {
        self.open = true;
    }

    /// Record that the transaction has ended. Idempotent.
    ///
    /// Returns whether a transaction was open.
    pub fn close(&mut self) -> bool {
        std::mem::replace(&mut self.open, false)
    }
}
