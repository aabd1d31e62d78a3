use thiserror::Error;

use laundrydesk_auth::AuthzError;
use laundrydesk_core::DomainError;

use crate::store::StoreError;

/// Errors returned by the infra services.
///
/// Domain failures (validation, permission, state) are kept apart from storage
/// failures so callers can tell "you may not" from "try again later".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            ServiceError::Store(_) => None,
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        ServiceError::Domain(value.into())
    }
}
