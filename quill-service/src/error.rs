use quill_common::model::{ModelValidationError, auth::HashError};
use quill_db::client::DbError;
use thiserror::Error;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

/// Service-level failure taxonomy. Store conditions pass through unchanged;
/// only [`ServiceError::is_transient`] failures are worth retrying.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ModelValidationError),
    #[error("The handle or credential did not match")]
    InvalidCredentials,
    #[error("Hashing a credential or session token failed: {0}")]
    Hash(#[from] HashError),
    #[error(transparent)]
    Store(#[from] DbError),
}

impl ServiceError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Store(error) if error.is_transient())
    }
}
