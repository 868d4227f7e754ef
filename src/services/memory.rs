use async_trait::async_trait;
use crate::core::error::{DirectoryError, StoreError};
use crate::core::store::{ProfileDirectory, RecordStore};
use crate::models::{Profile, RelationshipRecord, SetOp, UserId};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process record store
///
/// Each `apply` batch runs under the write lock, giving the same per-record
/// atomicity as the Postgres store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<UserId, RelationshipRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a record
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_record(&self, id: &UserId) -> Result<Option<RelationshipRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn create_if_absent(
        &self,
        id: &UserId,
        initial: &RelationshipRecord,
    ) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .entry(id.clone())
            .or_insert_with(|| initial.clone());
        Ok(())
    }

    async fn apply(&self, id: &UserId, ops: &[SetOp]) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(record) => record.apply(ops),
            None => tracing::debug!("Skipping {} set ops on missing record {}", ops.len(), id),
        }
        Ok(())
    }
}

/// In-process profile directory
#[derive(Debug, Default)]
pub struct MemoryProfileDirectory {
    profiles: RwLock<Vec<Profile>>,
}

impl MemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            profiles: RwLock::new(profiles),
        }
    }

    /// Load profiles from a JSON array
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::with_profiles(serde_json::from_str(json)?))
    }

    /// Add or replace a profile by id
    pub async fn upsert(&self, profile: Profile) {
        let mut profiles = self.profiles.write().await;
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
    }
}

#[async_trait]
impl ProfileDirectory for MemoryProfileDirectory {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, DirectoryError> {
        Ok(self.profiles.read().await.iter().find(|p| &p.id == id).cloned())
    }

    async fn query_by_university(&self, university: &str) -> Result<Vec<Profile>, DirectoryError> {
        Ok(self
            .profiles
            .read()
            .await
            .iter()
            .filter(|p| p.university == university)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LifestylePreferences, SetField};

    #[tokio::test]
    async fn test_create_if_absent_keeps_existing() {
        let store = MemoryRecordStore::new();
        let id = UserId::from("a");

        store.create_if_absent(&id, &RelationshipRecord::default()).await.unwrap();
        store.add_to_set(&id, SetField::Likes, &UserId::from("b")).await.unwrap();
        store.create_if_absent(&id, &RelationshipRecord::default()).await.unwrap();

        let record = store.get_record(&id).await.unwrap().unwrap();
        assert!(record.likes.contains(&UserId::from("b")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_apply_on_missing_record_is_noop() {
        let store = MemoryRecordStore::new();

        store
            .remove_from_set(&UserId::from("ghost"), SetField::Matches, &UserId::from("b"))
            .await
            .unwrap();

        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_directory_from_json() {
        let directory = MemoryProfileDirectory::from_json(
            r#"[{"id": "a", "university": "X", "firstName": "Ada", "lastName": "L", "age": 20}]"#,
        )
        .unwrap();

        let profile = directory.get_profile(&UserId::from("a")).await.unwrap().unwrap();
        assert_eq!(profile.university, "X");
        assert!(MemoryProfileDirectory::from_json("{").is_err());
    }

    #[tokio::test]
    async fn test_directory_upsert_and_query() {
        let directory = MemoryProfileDirectory::new();
        let mut profile = Profile {
            id: UserId::from("a"),
            university: "X".to_string(),
            first_name: "Ada".to_string(),
            last_name: "L".to_string(),
            age: Some(20),
            bio: None,
            lifestyle_preferences: LifestylePreferences::default(),
            profile_picture: None,
        };
        directory.upsert(profile.clone()).await;
        profile.university = "Y".to_string();
        directory.upsert(profile).await;

        assert!(directory.query_by_university("X").await.unwrap().is_empty());
        assert_eq!(directory.query_by_university("Y").await.unwrap().len(), 1);
    }
}
