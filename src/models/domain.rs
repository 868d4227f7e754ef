use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Opaque, externally issued user identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// User profile as stored in the profile directory
///
/// Read-only to this service; created by the profile completion flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(alias = "userId")]
    pub id: UserId,
    pub university: String,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(rename = "lifestylePreferences", default, deserialize_with = "null_as_default")]
    pub lifestyle_preferences: LifestylePreferences,
    #[serde(rename = "profilePicture", default)]
    pub profile_picture: Option<String>,
}

/// Self-described living habits, shown to other users as-is
///
/// Values are free text chosen by the profile form ("Yes", "Occasionally",
/// ...); a missing answer stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifestylePreferences {
    #[serde(default)]
    pub smoking: Option<String>,
    #[serde(default)]
    pub pets: Option<String>,
    #[serde(default)]
    pub noise: Option<String>,
    #[serde(default)]
    pub cleanliness: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Named array-valued fields of a relationship record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetField {
    #[serde(rename = "likes")]
    Likes,
    #[serde(rename = "dislikes")]
    Dislikes,
    #[serde(rename = "matches")]
    Matches,
    #[serde(rename = "roommates")]
    Roommates,
    #[serde(rename = "pendingRoommateRequests")]
    PendingRoommateRequests,
}

impl SetField {
    pub const ALL: [SetField; 5] = [
        SetField::Likes,
        SetField::Dislikes,
        SetField::Matches,
        SetField::Roommates,
        SetField::PendingRoommateRequests,
    ];

    /// Document field name
    pub fn as_str(&self) -> &'static str {
        match self {
            SetField::Likes => "likes",
            SetField::Dislikes => "dislikes",
            SetField::Matches => "matches",
            SetField::Roommates => "roommates",
            SetField::PendingRoommateRequests => "pendingRoommateRequests",
        }
    }
}

impl fmt::Display for SetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single commutative, idempotent set mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOp {
    Add(SetField, UserId),
    Remove(SetField, UserId),
}

impl SetOp {
    pub fn field(&self) -> SetField {
        match self {
            SetOp::Add(field, _) | SetOp::Remove(field, _) => *field,
        }
    }

    pub fn value(&self) -> &UserId {
        match self {
            SetOp::Add(_, value) | SetOp::Remove(_, value) => value,
        }
    }
}

/// Per-user relationship state
///
/// A missing record is equivalent to `RelationshipRecord::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    #[serde(default)]
    pub likes: BTreeSet<UserId>,
    #[serde(default)]
    pub dislikes: BTreeSet<UserId>,
    #[serde(default)]
    pub matches: BTreeSet<UserId>,
    #[serde(default)]
    pub roommates: BTreeSet<UserId>,
    #[serde(rename = "pendingRoommateRequests", default)]
    pub pending_roommate_requests: BTreeSet<UserId>,
}

impl RelationshipRecord {
    pub fn set(&self, field: SetField) -> &BTreeSet<UserId> {
        match field {
            SetField::Likes => &self.likes,
            SetField::Dislikes => &self.dislikes,
            SetField::Matches => &self.matches,
            SetField::Roommates => &self.roommates,
            SetField::PendingRoommateRequests => &self.pending_roommate_requests,
        }
    }

    pub fn set_mut(&mut self, field: SetField) -> &mut BTreeSet<UserId> {
        match field {
            SetField::Likes => &mut self.likes,
            SetField::Dislikes => &mut self.dislikes,
            SetField::Matches => &mut self.matches,
            SetField::Roommates => &mut self.roommates,
            SetField::PendingRoommateRequests => &mut self.pending_roommate_requests,
        }
    }

    pub fn contains(&self, field: SetField, id: &UserId) -> bool {
        self.set(field).contains(id)
    }

    /// Apply a batch of set operations in order
    pub fn apply(&mut self, ops: &[SetOp]) {
        for op in ops {
            match op {
                SetOp::Add(field, value) => {
                    self.set_mut(*field).insert(value.clone());
                }
                SetOp::Remove(field, value) => {
                    self.set_mut(*field).remove(value);
                }
            }
        }
    }

    /// Ids this user has already acted on and must not be offered again
    pub fn is_processed(&self, id: &UserId) -> bool {
        self.likes.contains(id)
            || self.dislikes.contains(id)
            || self.matches.contains(id)
            || self.roommates.contains(id)
    }
}

/// Result of a like action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    /// Best-effort signal that a mutual like was observed
    pub matched: bool,
}

/// Result of a confirm-roommate action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub finalized: bool,
}

/// Handshake state of an ordered pair of users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum HandshakeState {
    Unmatched,
    Matched,
    OneSidedRequest { requester: UserId },
    Confirmed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deserializes_missing_fields_as_empty() {
        let record: RelationshipRecord =
            serde_json::from_str(r#"{"likes": ["b"], "pendingRoommateRequests": ["c"]}"#).unwrap();

        assert!(record.contains(SetField::Likes, &UserId::from("b")));
        assert!(record.contains(SetField::PendingRoommateRequests, &UserId::from("c")));
        assert!(record.dislikes.is_empty());
        assert!(record.roommates.is_empty());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let ops = vec![
            SetOp::Add(SetField::Roommates, UserId::from("b")),
            SetOp::Remove(SetField::Matches, UserId::from("b")),
        ];
        let mut once = RelationshipRecord::default();
        once.matches.insert(UserId::from("b"));
        once.apply(&ops);

        let mut twice = once.clone();
        twice.apply(&ops);

        assert_eq!(once, twice);
        assert!(once.matches.is_empty());
    }

    #[test]
    fn test_profile_accepts_user_id_alias() {
        let profile: Profile = serde_json::from_str(
            r#"{"userId": "u1", "university": "X", "firstName": "Ada", "lastName": "L"}"#,
        )
        .unwrap();

        assert_eq!(profile.id.as_str(), "u1");
        assert_eq!(profile.age, None);
    }

    #[test]
    fn test_profile_reads_lifestyle_object() {
        let profile: Profile = serde_json::from_str(
            r#"{
                "userId": "u1",
                "university": "State U",
                "firstName": "Ada",
                "lastName": "L",
                "birthday": "2004-05-01",
                "bio": "Night owl",
                "lifestylePreferences": {"smoking": "No", "pets": "Yes", "noise": "Quiet", "cleanliness": "Very clean"}
            }"#,
        )
        .unwrap();

        assert_eq!(profile.lifestyle_preferences.smoking.as_deref(), Some("No"));
        assert_eq!(profile.lifestyle_preferences.cleanliness.as_deref(), Some("Very clean"));

        let partial: Profile = serde_json::from_str(
            r#"{"userId": "u2", "university": "State U", "lifestylePreferences": {"pets": "No"}}"#,
        )
        .unwrap();
        assert_eq!(partial.lifestyle_preferences.pets.as_deref(), Some("No"));
        assert_eq!(partial.lifestyle_preferences.noise, None);

        let null: Profile = serde_json::from_str(
            r#"{"userId": "u3", "university": "State U", "lifestylePreferences": null}"#,
        )
        .unwrap();
        assert_eq!(null.lifestyle_preferences, LifestylePreferences::default());
    }

    #[test]
    fn test_handshake_state_serialization() {
        let state = HandshakeState::OneSidedRequest { requester: UserId::from("a") };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "oneSidedRequest");
        assert_eq!(json["requester"], "a");
    }
}
