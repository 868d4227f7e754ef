// Service exports
pub mod appwrite;
pub mod cache;
pub mod memory;
pub mod postgres;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use cache::{CacheError, CacheKey, CacheManager, CachedDirectory};
pub use memory::{MemoryProfileDirectory, MemoryRecordStore};
pub use postgres::{PostgresClient, PostgresError};
