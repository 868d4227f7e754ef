use async_trait::async_trait;
use crate::core::error::DirectoryError;
use crate::core::store::ProfileDirectory;
use crate::models::{Profile, UserId};
use redis::aio::ConnectionManager;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Two-tier cache of JSON values
///
/// L1 is a per-process moka cache. L2 is an optional Redis shared by every
/// instance; an L2 hit is copied into L1. Both tiers expire entries after the
/// same TTL.
pub struct CacheManager {
    l1: moka::future::Cache<String, Arc<str>>,
    l2: Option<tokio::sync::Mutex<ConnectionManager>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Cache with a Redis L2 tier
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            l2: Some(tokio::sync::Mutex::new(connection)),
            ..Self::in_memory(l1_size, ttl_secs)
        })
    }

    /// Cache with the L1 tier only
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        let l1 = moka::future::Cache::builder()
            .max_capacity(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { l1, l2: None, ttl_secs }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, CacheError> {
        if let Some(json) = self.l1.get(key).await {
            tracing::trace!("L1 hit: {}", key);
            return Ok(serde_json::from_str(&json)?);
        }

        let Some(json) = self.l2_get(key).await? else {
            tracing::trace!("Cache miss: {}", key);
            return Err(CacheError::CacheMiss(key.to_string()));
        };

        tracing::trace!("L2 hit: {}", key);
        let value = serde_json::from_str(&json)?;
        self.l1.insert(key.to_string(), Arc::from(json)).await;
        Ok(value)
    }

    /// Write through both tiers
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let json = serde_json::to_string(value)?;

        if let Some(l2) = &self.l2 {
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(&json)
                .query_async(&mut *l2.lock().await)
                .await?;
        }
        self.l1.insert(key.to_string(), Arc::from(json)).await;

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1.invalidate(key).await;

        if let Some(l2) = &self.l2 {
            let _: () = redis::cmd("DEL")
                .arg(key)
                .query_async(&mut *l2.lock().await)
                .await?;
        }

        Ok(())
    }

    async fn l2_get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match &self.l2 {
            Some(l2) => Ok(redis::cmd("GET")
                .arg(key)
                .query_async(&mut *l2.lock().await)
                .await?),
            None => Ok(None),
        }
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a single profile
    pub fn profile(user_id: &UserId) -> String {
        format!("profile:{}", user_id)
    }

    /// Build a cache key for a university's profile listing
    pub fn university(name: &str) -> String {
        format!("university:{}", name)
    }
}

/// Profile directory with a read-through cache in front
///
/// Profiles are read-only to this service, so entries only expire by TTL.
/// Cache failures are logged and fall through to the wrapped directory.
pub struct CachedDirectory {
    inner: Arc<dyn ProfileDirectory>,
    cache: Arc<CacheManager>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn ProfileDirectory>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    async fn remember<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.set(key, value).await {
            tracing::warn!("Failed to cache {}: {}", key, e);
        }
    }
}

#[async_trait]
impl ProfileDirectory for CachedDirectory {
    async fn get_profile(&self, id: &UserId) -> Result<Option<Profile>, DirectoryError> {
        let key = CacheKey::profile(id);
        match self.cache.get::<Profile>(&key).await {
            Ok(profile) => return Ok(Some(profile)),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
        }

        let profile = self.inner.get_profile(id).await?;
        if let Some(profile) = &profile {
            self.remember(&key, profile).await;
        }
        Ok(profile)
    }

    async fn query_by_university(&self, university: &str) -> Result<Vec<Profile>, DirectoryError> {
        let key = CacheKey::university(university);
        match self.cache.get::<Vec<Profile>>(&key).await {
            Ok(profiles) => return Ok(profiles),
            Err(CacheError::CacheMiss(_)) => {}
            Err(e) => tracing::warn!("Cache read failed for {}: {}", key, e),
        }

        let profiles = self.inner.query_by_university(university).await?;
        self.remember(&key, &profiles).await;
        Ok(profiles)
    }
}
