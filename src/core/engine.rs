use crate::core::error::{ensure_distinct, RelationshipError};
use crate::core::filters::filter_candidates;
use crate::core::handshake::{handshake_state, RoommateHandshake};
use crate::core::store::{ProfileDirectory, RecordStore};
use crate::core::swipe::SwipeProcessor;
use crate::models::{
    ConfirmOutcome, HandshakeState, LikeOutcome, Profile, RelationshipRecord, UserId,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Entry point of the relationship state engine
///
/// Combines the candidate filter, swipe processor and roommate handshake
/// over one record store and one profile directory. Cheap to clone.
#[derive(Clone)]
pub struct RelationshipEngine {
    store: Arc<dyn RecordStore>,
    directory: Arc<dyn ProfileDirectory>,
    swipes: SwipeProcessor,
    handshake: RoommateHandshake,
}

impl RelationshipEngine {
    pub fn new(store: Arc<dyn RecordStore>, directory: Arc<dyn ProfileDirectory>) -> Self {
        Self {
            swipes: SwipeProcessor::new(store.clone()),
            handshake: RoommateHandshake::new(store.clone()),
            store,
            directory,
        }
    }

    /// Unprocessed candidates at the actor's university
    pub async fn get_candidates(&self, actor: &UserId) -> Result<Vec<UserId>, RelationshipError> {
        if actor.is_empty() {
            return Err(RelationshipError::InvalidArgument("user id must not be empty".into()));
        }

        let profile = self.require_profile(actor).await?;
        let snapshot = self.directory.query_by_university(&profile.university).await?;
        let record = self.relationships(actor).await?;

        let candidates = filter_candidates(&profile, &snapshot, &record);

        tracing::debug!(
            "{} candidates for {} at {} (from {} profiles)",
            candidates.len(),
            actor,
            profile.university,
            snapshot.len()
        );

        Ok(candidates)
    }

    pub async fn like(
        &self,
        actor: &UserId,
        target: &UserId,
    ) -> Result<LikeOutcome, RelationshipError> {
        self.swipes.like(actor, target).await
    }

    pub async fn dislike(&self, actor: &UserId, target: &UserId) -> Result<(), RelationshipError> {
        self.swipes.dislike(actor, target).await
    }

    pub async fn request_roommate(
        &self,
        requester: &UserId,
        target: &UserId,
    ) -> Result<(), RelationshipError> {
        self.handshake.request_roommate(requester, target).await
    }

    /// See [`RoommateHandshake::confirm_roommate`] for the partial-failure window.
    pub async fn confirm_roommate(
        &self,
        confirmer: &UserId,
        target: &UserId,
    ) -> Result<ConfirmOutcome, RelationshipError> {
        self.handshake.confirm_roommate(confirmer, target).await
    }

    /// Current record of a user, empty if they never acted
    pub async fn relationships(
        &self,
        actor: &UserId,
    ) -> Result<RelationshipRecord, RelationshipError> {
        Ok(self.store.get_record(actor).await?.unwrap_or_default())
    }

    /// Handshake state of the ordered pair `(actor, target)`
    pub async fn handshake_state(
        &self,
        actor: &UserId,
        target: &UserId,
    ) -> Result<HandshakeState, RelationshipError> {
        ensure_distinct(actor, target)?;

        let actor_record = self.relationships(actor).await?;
        let target_record = self.relationships(target).await?;

        Ok(handshake_state(actor, &actor_record, target, &target_record))
    }

    /// Profiles of the actor's current matches
    pub async fn match_profiles(&self, actor: &UserId) -> Result<Vec<Profile>, RelationshipError> {
        let record = self.relationships(actor).await?;
        self.resolve_profiles(&record.matches).await
    }

    /// Profiles of the actor's confirmed roommates
    pub async fn roommate_profiles(
        &self,
        actor: &UserId,
    ) -> Result<Vec<Profile>, RelationshipError> {
        let record = self.relationships(actor).await?;
        self.resolve_profiles(&record.roommates).await
    }

    async fn require_profile(&self, id: &UserId) -> Result<Profile, RelationshipError> {
        self.directory
            .get_profile(id)
            .await?
            .ok_or_else(|| RelationshipError::NotFound(format!("profile {}", id)))
    }

    // Ids without a profile are skipped
    async fn resolve_profiles(
        &self,
        ids: &BTreeSet<UserId>,
    ) -> Result<Vec<Profile>, RelationshipError> {
        let mut profiles = Vec::with_capacity(ids.len());
        for id in ids {
            match self.directory.get_profile(id).await? {
                Some(profile) => profiles.push(profile),
                None => tracing::warn!("No profile for related user {}", id),
            }
        }
        Ok(profiles)
    }
}
