// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ConfirmOutcome, HandshakeState, LifestylePreferences, LikeOutcome, Profile,
    RelationshipRecord, SetField, SetOp, UserId,
};
pub use requests::{CandidatesQuery, PairQuery, RoommateRequest, SwipeRequest};
pub use responses::{
    ActionResponse, CandidatesResponse, ConfirmResponse, ErrorResponse, HealthResponse,
    LikeResponse,
};
