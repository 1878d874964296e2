use std::cell::Cell;

use tracing::{debug, warn};

use crate::error::DriverError;
use crate::translator::{NormalizedError, Operation};

/// Whether a connection currently has an open transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    None,
    Active,
}

/// Tracks transaction state for one connection and rejects out-of-order calls.
///
/// Nested transactions are not supported: a second begin is an error. The
/// state only moves after the native call it guards has succeeded, so a
/// failed commit leaves the transaction active for the caller to roll back,
/// unless [`TransactionCoordinator::sync`] learns the backend ended it.
#[derive(Debug, Default)]
pub struct TransactionCoordinator {
    state: Cell<TransactionState>,
}

impl TransactionCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state.get()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    /// Run `native_begin` if no transaction is open, then mark it active.
    ///
    /// # Errors
    /// Returns `DriverError::TransactionFailed` if a transaction is already
    /// active or the native call fails.
    pub fn begin<F>(&self, native_begin: F) -> Result<(), DriverError>
    where
        F: FnOnce() -> Result<(), NormalizedError>,
    {
        if self.is_active() {
            return Err(DriverError::TransactionFailed(NormalizedError::local(
                Operation::BeginTransaction,
                "a transaction is already active; nested transactions are not supported",
            )));
        }
        native_begin().map_err(DriverError::TransactionFailed)?;
        self.state.set(TransactionState::Active);
        debug!("transaction started");
        Ok(())
    }

    /// Run `native_commit` for the open transaction, then mark it finished.
    ///
    /// # Errors
    /// Returns `DriverError::TransactionFailed` if no transaction is active or
    /// the native call fails.
    pub fn commit<F>(&self, native_commit: F) -> Result<(), DriverError>
    where
        F: FnOnce() -> Result<(), NormalizedError>,
    {
        self.finish(Operation::Commit, native_commit)
    }

    /// Run `native_rollback` for the open transaction, then mark it finished.
    ///
    /// # Errors
    /// Returns `DriverError::TransactionFailed` if no transaction is active or
    /// the native call fails.
    pub fn roll_back<F>(&self, native_rollback: F) -> Result<(), DriverError>
    where
        F: FnOnce() -> Result<(), NormalizedError>,
    {
        self.finish(Operation::RollBack, native_rollback)
    }

    /// Align the tracked state with what the backend reports.
    pub fn sync(&self, native_active: bool) {
        let state = if native_active {
            TransactionState::Active
        } else {
            TransactionState::None
        };
        if self.state.replace(state) != state {
            warn!(?state, "transaction state changed by the backend");
        }
    }

    fn finish<F>(&self, operation: Operation, native_call: F) -> Result<(), DriverError>
    where
        F: FnOnce() -> Result<(), NormalizedError>,
    {
        if !self.is_active() {
            return Err(DriverError::TransactionFailed(NormalizedError::local(
                operation,
                "no active transaction",
            )));
        }
        native_call().map_err(DriverError::TransactionFailed)?;
        self.state.set(TransactionState::None);
        debug!(%operation, "transaction finished");
        Ok(())
    }
}
