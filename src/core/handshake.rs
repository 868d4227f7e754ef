use crate::core::error::{ensure_distinct, RelationshipError};
use crate::core::store::RecordStore;
use crate::models::{ConfirmOutcome, HandshakeState, RelationshipRecord, SetField, SetOp, UserId};
use std::sync::Arc;

/// What a confirm action does, computed from both records before any write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeDecision {
    /// Both sides already list each other as roommates; nothing to write.
    AlreadyRoommates,
    /// The other side asked first, or an earlier finalization stopped
    /// half-way; write the promotion on both records.
    Finalize,
    /// Nobody asked yet; record a one-sided request instead.
    IssueRequest,
}

/// Decide how `confirmer` confirming `target` must be handled
pub fn decide(
    confirmer: &UserId,
    confirmer_record: &RelationshipRecord,
    target: &UserId,
    target_record: &RelationshipRecord,
) -> HandshakeDecision {
    let confirmer_side = confirmer_record.contains(SetField::Roommates, target);
    let target_side = target_record.contains(SetField::Roommates, confirmer);

    if confirmer_side && target_side {
        let leftovers = confirmer_record.contains(SetField::Matches, target)
            || confirmer_record.contains(SetField::PendingRoommateRequests, target)
            || target_record.contains(SetField::Matches, confirmer)
            || target_record.contains(SetField::PendingRoommateRequests, confirmer);

        return if leftovers {
            HandshakeDecision::Finalize
        } else {
            HandshakeDecision::AlreadyRoommates
        };
    }

    if confirmer_side || target_side {
        return HandshakeDecision::Finalize;
    }

    if target_record.contains(SetField::PendingRoommateRequests, confirmer) {
        HandshakeDecision::Finalize
    } else {
        HandshakeDecision::IssueRequest
    }
}

/// Derive the handshake state of the ordered pair `(a, b)`
///
/// A pair where only one side lists the other as roommate is reported as
/// `Confirmed`: finalization has started and the next confirm completes it.
pub fn handshake_state(
    a: &UserId,
    a_record: &RelationshipRecord,
    b: &UserId,
    b_record: &RelationshipRecord,
) -> HandshakeState {
    if a_record.contains(SetField::Roommates, b) || b_record.contains(SetField::Roommates, a) {
        return HandshakeState::Confirmed;
    }

    if a_record.contains(SetField::PendingRoommateRequests, b) {
        return HandshakeState::OneSidedRequest { requester: a.clone() };
    }

    if b_record.contains(SetField::PendingRoommateRequests, a) {
        return HandshakeState::OneSidedRequest { requester: b.clone() };
    }

    if a_record.contains(SetField::Matches, b) || b_record.contains(SetField::Matches, a) {
        return HandshakeState::Matched;
    }

    HandshakeState::Unmatched
}

fn promotion(counterpart: &UserId) -> [SetOp; 3] {
    [
        SetOp::Remove(SetField::Matches, counterpart.clone()),
        SetOp::Remove(SetField::PendingRoommateRequests, counterpart.clone()),
        SetOp::Add(SetField::Roommates, counterpart.clone()),
    ]
}

/// Two-phase request/confirm protocol promoting a match to roommates
#[derive(Clone)]
pub struct RoommateHandshake {
    store: Arc<dyn RecordStore>,
}

impl RoommateHandshake {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Ask `target` to become roommates. Pure append, idempotent.
    pub async fn request_roommate(
        &self,
        requester: &UserId,
        target: &UserId,
    ) -> Result<(), RelationshipError> {
        ensure_distinct(requester, target)?;

        self.store
            .create_if_absent(requester, &RelationshipRecord::default())
            .await?;
        self.store
            .add_to_set(requester, SetField::PendingRoommateRequests, target)
            .await?;

        tracing::info!("Roommate request: {} -> {}", requester, target);

        Ok(())
    }

    /// Confirm `target` as roommate, or request it if `target` has not asked
    ///
    /// Finalization is two separate record writes, confirmer first. If the
    /// second write fails the pair is left half-promoted; the error is
    /// returned and retrying the whole call completes the promotion, because
    /// a half-promoted pair always decides to `Finalize`.
    pub async fn confirm_roommate(
        &self,
        confirmer: &UserId,
        target: &UserId,
    ) -> Result<ConfirmOutcome, RelationshipError> {
        ensure_distinct(confirmer, target)?;

        let target_record = self
            .store
            .get_record(target)
            .await?
            .ok_or_else(|| RelationshipError::NotFound(format!("relationship record {}", target)))?;
        let confirmer_record = self.store.get_record(confirmer).await?.unwrap_or_default();

        let decision = decide(confirmer, &confirmer_record, target, &target_record);
        tracing::debug!("Handshake {} -> {}: {:?}", confirmer, target, decision);

        match decision {
            HandshakeDecision::AlreadyRoommates => Ok(ConfirmOutcome { finalized: true }),
            HandshakeDecision::IssueRequest => {
                self.request_roommate(confirmer, target).await?;
                Ok(ConfirmOutcome { finalized: false })
            }
            HandshakeDecision::Finalize => {
                self.finalize(confirmer, target).await?;
                Ok(ConfirmOutcome { finalized: true })
            }
        }
    }

    async fn finalize(&self, confirmer: &UserId, target: &UserId) -> Result<(), RelationshipError> {
        self.store
            .create_if_absent(confirmer, &RelationshipRecord::default())
            .await?;
        self.store.apply(confirmer, &promotion(target)).await?;

        if let Err(e) = self.store.apply(target, &promotion(confirmer)).await {
            tracing::warn!(
                "Roommate promotion of {} and {} is half-applied, retry required: {}",
                confirmer,
                target,
                e
            );
            return Err(e.into());
        }

        tracing::info!("{} and {} are now roommates", confirmer, target);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: &str) -> UserId {
        UserId::from(value)
    }

    fn record_with(field: SetField, values: &[&str]) -> RelationshipRecord {
        let mut record = RelationshipRecord::default();
        for value in values {
            record.set_mut(field).insert(id(value));
        }
        record
    }

    #[test]
    fn test_decide_issue_request_without_prior_request() {
        let a = record_with(SetField::Matches, &["b"]);
        let b = record_with(SetField::Matches, &["a"]);

        assert_eq!(decide(&id("a"), &a, &id("b"), &b), HandshakeDecision::IssueRequest);
    }

    #[test]
    fn test_decide_finalize_when_target_requested() {
        let a = record_with(SetField::Matches, &["b"]);
        let mut b = record_with(SetField::Matches, &["a"]);
        b.pending_roommate_requests.insert(id("a"));

        assert_eq!(decide(&id("a"), &a, &id("b"), &b), HandshakeDecision::Finalize);
    }

    #[test]
    fn test_decide_own_request_is_not_enough() {
        let mut a = record_with(SetField::Matches, &["b"]);
        a.pending_roommate_requests.insert(id("b"));
        let b = record_with(SetField::Matches, &["a"]);

        assert_eq!(decide(&id("a"), &a, &id("b"), &b), HandshakeDecision::IssueRequest);
    }

    #[test]
    fn test_decide_already_roommates() {
        let a = record_with(SetField::Roommates, &["b"]);
        let b = record_with(SetField::Roommates, &["a"]);

        assert_eq!(decide(&id("a"), &a, &id("b"), &b), HandshakeDecision::AlreadyRoommates);
    }

    #[test]
    fn test_decide_finalize_heals_half_promotion() {
        let a = record_with(SetField::Roommates, &["b"]);
        let b = record_with(SetField::Matches, &["a"]);

        assert_eq!(decide(&id("a"), &a, &id("b"), &b), HandshakeDecision::Finalize);
        assert_eq!(decide(&id("b"), &b, &id("a"), &a), HandshakeDecision::Finalize);
    }

    #[test]
    fn test_decide_finalize_clears_stale_request() {
        let mut a = record_with(SetField::Roommates, &["b"]);
        a.pending_roommate_requests.insert(id("b"));
        let b = record_with(SetField::Roommates, &["a"]);

        assert_eq!(decide(&id("a"), &a, &id("b"), &b), HandshakeDecision::Finalize);
    }

    #[test]
    fn test_state_progression() {
        let empty = RelationshipRecord::default();
        assert_eq!(handshake_state(&id("a"), &empty, &id("b"), &empty), HandshakeState::Unmatched);

        let a = record_with(SetField::Matches, &["b"]);
        let b = record_with(SetField::Matches, &["a"]);
        assert_eq!(handshake_state(&id("a"), &a, &id("b"), &b), HandshakeState::Matched);

        let mut b_requested = b.clone();
        b_requested.pending_roommate_requests.insert(id("a"));
        assert_eq!(
            handshake_state(&id("a"), &a, &id("b"), &b_requested),
            HandshakeState::OneSidedRequest { requester: id("b") }
        );

        let a_done = record_with(SetField::Roommates, &["b"]);
        let b_done = record_with(SetField::Roommates, &["a"]);
        assert_eq!(
            handshake_state(&id("a"), &a_done, &id("b"), &b_done),
            HandshakeState::Confirmed
        );
    }
}
