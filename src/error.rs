use std::time::Duration;

use sled::transaction::{ConflictableTransactionError, TransactionError};

use crate::capacity::Rejection;

pub type Result<T, E = BookingError> = std::result::Result<T, E>;

/// Broad classification a caller can map onto its own transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Transient,
    Internal,
}

#[derive(thiserror::Error, Debug)]
pub enum BookingError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("{0}")]
    IllegalState(String),
    #[error("Timed out after {waited:?} waiting for exclusive access to voyage {voyage_id}")]
    LockTimeout { voyage_id: String, waited: Duration },
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(#[from] minicbor::encode::Error<std::convert::Infallible>),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("failed to mint identifier: {0}")]
    Identifier(#[from] bech32::EncodeError),
}

impl BookingError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Rejected(_) | Self::IllegalState(_) => ErrorKind::Conflict,
            Self::LockTimeout { .. } => ErrorKind::Transient,
            Self::Storage(_) | Self::Encode(_) | Self::Decode(_) | Self::Identifier(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Only lock contention is safe to resubmit; business rejections are final.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

impl From<TransactionError<BookingError>> for BookingError {
    fn from(value: TransactionError<BookingError>) -> Self {
        match value {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => Self::Storage(e),
        }
    }
}

/// Abort a sled transaction with a domain error.
pub(crate) fn abort<T>(err: impl Into<BookingError>) -> Result<T, ConflictableTransactionError<BookingError>> {
    Err(ConflictableTransactionError::Abort(err.into()))
}
