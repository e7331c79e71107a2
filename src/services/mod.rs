pub mod auth;
pub mod documents;
pub mod protocols;

pub use auth::{AuthError, AuthService, TokenGrant};
pub use documents::DocumentService;
pub use protocols::ProtocolService;

use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::storage::StorageError;

/// Pipeline error taxonomy. Callers map these onto HTTP statuses; see
/// `ApiError` for the mapping.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    StorageUnavailable(String),

    #[error("{0}")]
    Persistence(String),
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ServiceError::NotFound(msg),
            other => ServiceError::Persistence(other.to_string()),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::StorageUnavailable(err.to_string())
    }
}
