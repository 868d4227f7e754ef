//! Roomie Match - relationship state engine for the RoomieLife roommate app
//!
//! Turns independent per-user swipes into consistent "liked", "matched" and
//! "roommate" relationships, using only per-record atomic set operations on
//! the backing document store.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{RelationshipEngine, RelationshipError, RecordStore, ProfileDirectory};
pub use models::{Profile, RelationshipRecord, UserId, LikeOutcome, ConfirmOutcome, HandshakeState};
