use async_trait::async_trait;
use crate::core::error::{DirectoryError, StoreError};
use crate::models::{Profile, RelationshipRecord, SetField, SetOp, UserId};

/// Document store holding one relationship record per user
///
/// Implementations must apply each `apply` batch atomically against a single
/// record, with set semantics: adding a present value or removing an absent
/// one is a no-op. Nothing is guaranteed across two different records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a record, `None` when the user never acted.
    async fn get_record(&self, id: &UserId) -> Result<Option<RelationshipRecord>, StoreError>;

    /// Insert `initial` unless a record already exists.
    async fn create_if_absent(
        &self,
        id: &UserId,
        initial: &RelationshipRecord,
    ) -> Result<(), StoreError>;

    /// Apply a batch of set operations atomically to one record.
    ///
    /// Applying to a missing record is a no-op.
    async fn apply(&self, id: &UserId, ops: &[SetOp]) -> Result<(), StoreError>;

    async fn add_to_set(
        &self,
        id: &UserId,
        field: SetField,
        value: &UserId,
    ) -> Result<(), StoreError> {
        self.apply(id, &[SetOp::Add(field, value.clone())]).await
    }

    async fn remove_from_set(
        &self,
        id: &UserId,
        field: SetField,
        value: &UserId,
    ) -> Result<(), StoreError> {
        self.apply(id, &[SetOp::Remove(field, value.clone())]).await
    }
}

/// Read-only view over user profiles
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, DirectoryError>;

    async fn query_by_university(&self, university: &str) -> Result<Vec<Profile>, DirectoryError>;
}
