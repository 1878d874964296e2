use thiserror::Error;

use crate::translator::{NormalizedError, Operation};

/// Every way a driver operation can fail.
///
/// Each variant wraps a [`NormalizedError`] so callers can branch on the kind
/// and still reach the native code, SQLSTATE and message.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Connection error: {0}")]
    ConnectionFailed(NormalizedError),

    #[error("Prepare error: {0}")]
    PrepareFailed(NormalizedError),

    #[error("SQL execution error: {0}")]
    ExecutionFailed(NormalizedError),

    #[error("Transaction error: {0}")]
    TransactionFailed(NormalizedError),

    #[error("Fetch error: {0}")]
    FetchFailed(NormalizedError),
}

/// Discriminant of [`DriverError`], convenient for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConnectionFailed,
    PrepareFailed,
    ExecutionFailed,
    TransactionFailed,
    FetchFailed,
}

impl DriverError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
            DriverError::PrepareFailed(_) => ErrorKind::PrepareFailed,
            DriverError::ExecutionFailed(_) => ErrorKind::ExecutionFailed,
            DriverError::TransactionFailed(_) => ErrorKind::TransactionFailed,
            DriverError::FetchFailed(_) => ErrorKind::FetchFailed,
        }
    }

    #[must_use]
    pub fn normalized(&self) -> &NormalizedError {
        match self {
            DriverError::ConnectionFailed(err)
            | DriverError::PrepareFailed(err)
            | DriverError::ExecutionFailed(err)
            | DriverError::TransactionFailed(err)
            | DriverError::FetchFailed(err) => err,
        }
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.normalized().operation()
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        DriverError::ConnectionFailed(NormalizedError::local(Operation::Configure, message))
    }
}
