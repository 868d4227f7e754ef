use crate::core::error::{ensure_distinct, RelationshipError};
use crate::core::store::RecordStore;
use crate::models::{LikeOutcome, RelationshipRecord, SetField, SetOp, UserId};
use std::sync::Arc;

/// Applies like/dislike actions and detects mutual likes
///
/// Each action writes only to the actor's record, except a detected mutual
/// like which adds the match to both records with two independent writes.
#[derive(Clone)]
pub struct SwipeProcessor {
    store: Arc<dyn RecordStore>,
}

impl SwipeProcessor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Record that `actor` is interested in `target`
    ///
    /// Retracts an earlier dislike of the same target in the same atomic
    /// write. The mutual check always runs, even when the like was already
    /// recorded, so a match missed by a concurrent like on the other side is
    /// created by whichever call observes both likes.
    pub async fn like(
        &self,
        actor: &UserId,
        target: &UserId,
    ) -> Result<LikeOutcome, RelationshipError> {
        ensure_distinct(actor, target)?;

        self.store
            .create_if_absent(actor, &RelationshipRecord::default())
            .await?;
        self.store
            .apply(
                actor,
                &[
                    SetOp::Add(SetField::Likes, target.clone()),
                    SetOp::Remove(SetField::Dislikes, target.clone()),
                ],
            )
            .await?;

        tracing::debug!("Recorded like: {} -> {}", actor, target);

        let matched = self.evaluate_mutual(actor, target).await?;

        Ok(LikeOutcome { matched })
    }

    /// Record that `actor` is not interested in `target`
    ///
    /// Retracts an earlier like of the same target. Existing matches are not
    /// touched.
    pub async fn dislike(&self, actor: &UserId, target: &UserId) -> Result<(), RelationshipError> {
        ensure_distinct(actor, target)?;

        self.store
            .create_if_absent(actor, &RelationshipRecord::default())
            .await?;
        self.store
            .apply(
                actor,
                &[
                    SetOp::Add(SetField::Dislikes, target.clone()),
                    SetOp::Remove(SetField::Likes, target.clone()),
                ],
            )
            .await?;

        tracing::debug!("Recorded dislike: {} -> {}", actor, target);

        Ok(())
    }

    /// Create the match on both sides if `target` already likes `actor` and
    /// neither side lists the other as roommate
    async fn evaluate_mutual(
        &self,
        actor: &UserId,
        target: &UserId,
    ) -> Result<bool, RelationshipError> {
        let target_record = match self.store.get_record(target).await? {
            Some(record) => record,
            None => return Ok(false),
        };

        if !target_record.contains(SetField::Likes, actor) {
            return Ok(false);
        }

        // Promoted pairs never go back into matches, even when only one side
        // has been promoted so far
        let actor_record = self.store.get_record(actor).await?.unwrap_or_default();
        if target_record.contains(SetField::Roommates, actor)
            || actor_record.contains(SetField::Roommates, target)
        {
            tracing::debug!("{} and {} are already roommates", actor, target);
            return Ok(false);
        }

        self.store.add_to_set(actor, SetField::Matches, target).await?;
        self.store.add_to_set(target, SetField::Matches, actor).await?;

        tracing::info!("Mutual like between {} and {}", actor, target);

        Ok(true)
    }
}
