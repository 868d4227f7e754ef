// Core engine exports
pub mod engine;
pub mod error;
pub mod filters;
pub mod handshake;
pub mod store;
pub mod swipe;

pub use engine::RelationshipEngine;
pub use error::{DirectoryError, RelationshipError, StoreError};
pub use filters::{filter_candidates, is_candidate};
pub use handshake::{decide, handshake_state, HandshakeDecision, RoommateHandshake};
pub use store::{ProfileDirectory, RecordStore};
pub use swipe::SwipeProcessor;
