// Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use roomie_match::core::{RecordStore, RelationshipEngine, StoreError};
use roomie_match::models::{LifestylePreferences, Profile, RelationshipRecord, SetOp, UserId};
use roomie_match::services::{MemoryProfileDirectory, MemoryRecordStore};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub fn id(value: &str) -> UserId {
    UserId::from(value)
}

pub fn create_test_profile(user_id: &str, university: &str) -> Profile {
    Profile {
        id: id(user_id),
        university: university.to_string(),
        first_name: format!("User {}", user_id),
        last_name: "Test".to_string(),
        age: Some(20),
        bio: Some("Quiet, tidy, likes plants".to_string()),
        lifestyle_preferences: LifestylePreferences {
            smoking: Some("No".to_string()),
            ..LifestylePreferences::default()
        },
        profile_picture: None,
    }
}

/// Engine over in-memory adapters, returning the store for inspection
pub fn memory_engine(profiles: Vec<Profile>) -> (RelationshipEngine, Arc<MemoryRecordStore>) {
    let store = Arc::new(MemoryRecordStore::new());
    let directory = Arc::new(MemoryProfileDirectory::with_profiles(profiles));
    (RelationshipEngine::new(store.clone(), directory), store)
}

pub async fn record_of<S: RecordStore + ?Sized>(store: &S, user: &str) -> RelationshipRecord {
    store.get_record(&id(user)).await.unwrap().unwrap_or_default()
}

/// Record store wrapper that simulates network lag and failures
///
/// - `lag_with` makes the next read of a user return a fixed stale snapshot
/// - `fail_next_apply` makes the next batch against a user fail
/// - `yielding` yields to the scheduler around every call
pub struct FaultyStore {
    inner: MemoryRecordStore,
    stale: Mutex<HashMap<UserId, Option<RelationshipRecord>>>,
    failing: Mutex<HashSet<UserId>>,
    yielding: bool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            stale: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            yielding: false,
        }
    }

    pub fn yielding() -> Self {
        Self {
            yielding: true,
            ..Self::new()
        }
    }

    pub fn lag_with(&self, user: &str, snapshot: Option<RelationshipRecord>) {
        self.stale.lock().unwrap().insert(id(user), snapshot);
    }

    pub fn fail_next_apply(&self, user: &str) {
        self.failing.lock().unwrap().insert(id(user));
    }

    async fn maybe_yield(&self) {
        if self.yielding {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl RecordStore for FaultyStore {
    async fn get_record(&self, user: &UserId) -> Result<Option<RelationshipRecord>, StoreError> {
        self.maybe_yield().await;
        let stale = self.stale.lock().unwrap().remove(user);
        match stale {
            Some(snapshot) => Ok(snapshot),
            None => self.inner.get_record(user).await,
        }
    }

    async fn create_if_absent(
        &self,
        user: &UserId,
        initial: &RelationshipRecord,
    ) -> Result<(), StoreError> {
        self.maybe_yield().await;
        self.inner.create_if_absent(user, initial).await
    }

    async fn apply(&self, user: &UserId, ops: &[SetOp]) -> Result<(), StoreError> {
        self.maybe_yield().await;
        let fail = self.failing.lock().unwrap().remove(user);
        if fail {
            return Err(StoreError::Unavailable(format!("injected failure for {}", user)));
        }
        self.inner.apply(user, ops).await
    }
}

/// Engine over a `FaultyStore`
pub fn faulty_engine(store: FaultyStore, profiles: Vec<Profile>) -> (RelationshipEngine, Arc<FaultyStore>) {
    let store = Arc::new(store);
    let directory = Arc::new(MemoryProfileDirectory::with_profiles(profiles));
    (RelationshipEngine::new(store.clone(), directory), store)
}
