use crate::models::UserId;
use thiserror::Error;

/// Errors surfaced by the relationship engine to its callers
///
/// Every mutating operation is built from idempotent set primitives, so a
/// failed call can always be retried as a whole.
#[derive(Debug, Error)]
pub enum RelationshipError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl RelationshipError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelationshipError::StorageUnavailable(_))
    }
}

/// Errors raised by record store adapters
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt record for {user_id}: {reason}")]
    Corrupt { user_id: String, reason: String },
}

/// Errors raised by profile directory adapters
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Profile directory unavailable: {0}")]
    Unavailable(String),

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Invalid profile document: {0}")]
    InvalidResponse(String),
}

/// Reject empty ids and self-targeted actions
pub(crate) fn ensure_distinct(actor: &UserId, target: &UserId) -> Result<(), RelationshipError> {
    if actor.is_empty() || target.is_empty() {
        return Err(RelationshipError::InvalidArgument("user id must not be empty".into()));
    }
    if actor == target {
        return Err(RelationshipError::InvalidArgument(format!(
            "user {} cannot target themselves",
            actor
        )));
    }
    Ok(())
}

impl From<StoreError> for RelationshipError {
    fn from(err: StoreError) -> Self {
        RelationshipError::StorageUnavailable(err.to_string())
    }
}

impl From<DirectoryError> for RelationshipError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(id) => RelationshipError::NotFound(format!("profile {}", id)),
            other => RelationshipError::StorageUnavailable(other.to_string()),
        }
    }
}
