use crate::models::{Profile, RelationshipRecord, UserId};
use std::collections::HashSet;

/// Check if a profile is eligible to be swiped by the actor
///
/// Eligible means same university, not the actor themselves, and not yet
/// liked, disliked, matched or roommate.
#[inline]
pub fn is_candidate(actor: &Profile, profile: &Profile, record: &RelationshipRecord) -> bool {
    if profile.id == actor.id {
        return false;
    }

    if profile.university != actor.university {
        return false;
    }

    !record.is_processed(&profile.id)
}

/// Compute the unprocessed candidates for a user
///
/// Output keeps the snapshot order with duplicates dropped, so it is stable
/// for as long as the directory snapshot is. The excluded set only ever grows,
/// which means re-filtering after a swipe drops exactly the swiped id.
pub fn filter_candidates(
    actor: &Profile,
    snapshot: &[Profile],
    record: &RelationshipRecord,
) -> Vec<UserId> {
    let mut seen = HashSet::with_capacity(snapshot.len());

    snapshot
        .iter()
        .filter(|profile| is_candidate(actor, profile, record))
        .filter(|profile| seen.insert(profile.id.clone()))
        .map(|profile| profile.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LifestylePreferences;

    fn create_test_profile(id: &str, university: &str) -> Profile {
        Profile {
            id: UserId::from(id),
            university: university.to_string(),
            first_name: format!("First {}", id),
            last_name: "Test".to_string(),
            age: Some(20),
            bio: None,
            lifestyle_preferences: LifestylePreferences::default(),
            profile_picture: None,
        }
    }

    #[test]
    fn test_excludes_self() {
        let actor = create_test_profile("a", "X");
        let snapshot = vec![actor.clone(), create_test_profile("b", "X")];

        let candidates = filter_candidates(&actor, &snapshot, &RelationshipRecord::default());

        assert_eq!(candidates, vec![UserId::from("b")]);
    }

    #[test]
    fn test_excludes_other_universities() {
        let actor = create_test_profile("a", "X");
        let snapshot = vec![create_test_profile("b", "Y"), create_test_profile("c", "X")];

        let candidates = filter_candidates(&actor, &snapshot, &RelationshipRecord::default());

        assert_eq!(candidates, vec![UserId::from("c")]);
    }

    #[test]
    fn test_excludes_processed_ids() {
        let actor = create_test_profile("a", "X");
        let snapshot: Vec<Profile> = ["b", "c", "d", "e", "f"]
            .iter()
            .map(|id| create_test_profile(id, "X"))
            .collect();

        let mut record = RelationshipRecord::default();
        record.likes.insert(UserId::from("b"));
        record.dislikes.insert(UserId::from("c"));
        record.matches.insert(UserId::from("d"));
        record.roommates.insert(UserId::from("e"));

        let candidates = filter_candidates(&actor, &snapshot, &record);

        assert_eq!(candidates, vec![UserId::from("f")]);
    }

    #[test]
    fn test_pending_request_alone_does_not_exclude() {
        let actor = create_test_profile("a", "X");
        let snapshot = vec![create_test_profile("b", "X")];
        let mut record = RelationshipRecord::default();
        record.pending_roommate_requests.insert(UserId::from("b"));

        assert!(is_candidate(&actor, &snapshot[0], &record));
    }

    #[test]
    fn test_duplicates_collapsed_in_order() {
        let actor = create_test_profile("a", "X");
        let snapshot = vec![
            create_test_profile("c", "X"),
            create_test_profile("b", "X"),
            create_test_profile("c", "X"),
        ];

        let candidates = filter_candidates(&actor, &snapshot, &RelationshipRecord::default());

        assert_eq!(candidates, vec![UserId::from("c"), UserId::from("b")]);
    }

    #[test]
    fn test_refilter_removes_only_swiped_candidate() {
        let actor = create_test_profile("a", "X");
        let snapshot: Vec<Profile> = ["b", "c", "d"]
            .iter()
            .map(|id| create_test_profile(id, "X"))
            .collect();

        let mut record = RelationshipRecord::default();
        let before = filter_candidates(&actor, &snapshot, &record);

        record.dislikes.insert(UserId::from("c"));
        let after = filter_candidates(&actor, &snapshot, &record);

        assert_eq!(before, vec![UserId::from("b"), UserId::from("c"), UserId::from("d")]);
        assert_eq!(after, vec![UserId::from("b"), UserId::from("d")]);
    }
}
