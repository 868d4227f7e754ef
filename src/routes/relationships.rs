use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::core::{RelationshipEngine, RelationshipError};
use crate::models::{
    ActionResponse, CandidatesQuery, CandidatesResponse, ConfirmResponse, ErrorResponse,
    HealthResponse, LikeResponse, PairQuery, RoommateRequest, SwipeRequest, UserId,
};
use crate::services::PostgresClient;
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: RelationshipEngine,
    pub postgres: Option<Arc<PostgresClient>>,
}

/// Configure all relationship routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/candidates", web::get().to(get_candidates))
        .route("/swipes/like", web::post().to(like))
        .route("/swipes/dislike", web::post().to(dislike))
        .route("/roommates/request", web::post().to(request_roommate))
        .route("/roommates/confirm", web::post().to(confirm_roommate))
        .route("/handshake", web::get().to(get_handshake_state))
        .route("/relationships/{user_id}", web::get().to(get_relationships))
        .route("/relationships/{user_id}/matches", web::get().to(get_match_profiles))
        .route("/relationships/{user_id}/roommates", web::get().to(get_roommate_profiles));
}

/// Translate an engine error into a JSON error response
fn error_response(context: &str, err: RelationshipError) -> HttpResponse {
    let (mut builder, status_code) = match &err {
        RelationshipError::InvalidArgument(_) => (HttpResponse::BadRequest(), 400),
        RelationshipError::NotFound(_) => (HttpResponse::NotFound(), 404),
        RelationshipError::StorageUnavailable(_) => (HttpResponse::ServiceUnavailable(), 503),
    };

    if err.is_retryable() {
        tracing::error!("{}: {}", context, err);
    } else {
        tracing::info!("{}: {}", context, err);
    }

    builder.json(ErrorResponse {
        error: context.to_string(),
        message: err.to_string(),
        status_code,
    })
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = match &state.postgres {
        Some(postgres) => postgres.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Candidates endpoint
///
/// GET /api/v1/candidates?userId={userId}
async fn get_candidates(
    state: web::Data<AppState>,
    query: web::Query<CandidatesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    let user_id = UserId::from(query.user_id.as_str());

    match state.engine.get_candidates(&user_id).await {
        Ok(candidates) => {
            tracing::info!("Returning {} candidates for {}", candidates.len(), user_id);
            HttpResponse::Ok().json(CandidatesResponse {
                total: candidates.len(),
                candidates,
            })
        }
        Err(e) => error_response("Failed to fetch candidates", e),
    }
}

/// Like endpoint
///
/// POST /api/v1/swipes/like
///
/// Request body:
/// ```json
/// { "userId": "string", "targetUserId": "string" }
/// ```
async fn like(state: web::Data<AppState>, req: web::Json<SwipeRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let actor = UserId::from(req.user_id.as_str());
    let target = UserId::from(req.target_user_id.as_str());

    match state.engine.like(&actor, &target).await {
        Ok(outcome) => HttpResponse::Ok().json(LikeResponse { matched: outcome.matched }),
        Err(e) => error_response("Failed to record like", e),
    }
}

/// Dislike endpoint
///
/// POST /api/v1/swipes/dislike
async fn dislike(state: web::Data<AppState>, req: web::Json<SwipeRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let actor = UserId::from(req.user_id.as_str());
    let target = UserId::from(req.target_user_id.as_str());

    match state.engine.dislike(&actor, &target).await {
        Ok(()) => HttpResponse::Ok().json(ActionResponse { success: true }),
        Err(e) => error_response("Failed to record dislike", e),
    }
}

/// Roommate request endpoint
///
/// POST /api/v1/roommates/request
async fn request_roommate(
    state: web::Data<AppState>,
    req: web::Json<RoommateRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let requester = UserId::from(req.user_id.as_str());
    let target = UserId::from(req.target_user_id.as_str());

    match state.engine.request_roommate(&requester, &target).await {
        Ok(()) => HttpResponse::Ok().json(ActionResponse { success: true }),
        Err(e) => error_response("Failed to send roommate request", e),
    }
}

/// Roommate confirm endpoint
///
/// POST /api/v1/roommates/confirm
///
/// Falls back to a request when the target has not asked yet; `finalized`
/// tells the client which one happened.
async fn confirm_roommate(
    state: web::Data<AppState>,
    req: web::Json<RoommateRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let confirmer = UserId::from(req.user_id.as_str());
    let target = UserId::from(req.target_user_id.as_str());

    match state.engine.confirm_roommate(&confirmer, &target).await {
        Ok(outcome) => HttpResponse::Ok().json(ConfirmResponse { finalized: outcome.finalized }),
        Err(e) => error_response("Failed to confirm roommate", e),
    }
}

/// GET /api/v1/handshake?userId={userId}&targetUserId={targetUserId}
async fn get_handshake_state(
    state: web::Data<AppState>,
    query: web::Query<PairQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    let actor = UserId::from(query.user_id.as_str());
    let target = UserId::from(query.target_user_id.as_str());

    match state.engine.handshake_state(&actor, &target).await {
        Ok(handshake) => HttpResponse::Ok().json(handshake),
        Err(e) => error_response("Failed to read handshake state", e),
    }
}

/// GET /api/v1/relationships/{userId}
async fn get_relationships(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let user_id = UserId::from(path.into_inner());

    match state.engine.relationships(&user_id).await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(e) => error_response("Failed to read relationships", e),
    }
}

/// GET /api/v1/relationships/{userId}/matches
async fn get_match_profiles(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let user_id = UserId::from(path.into_inner());

    match state.engine.match_profiles(&user_id).await {
        Ok(profiles) => HttpResponse::Ok().json(profiles),
        Err(e) => error_response("Failed to read matches", e),
    }
}

/// GET /api/v1/relationships/{userId}/roommates
async fn get_roommate_profiles(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    let user_id = UserId::from(path.into_inner());

    match state.engine.roommate_profiles(&user_id).await {
        Ok(profiles) => HttpResponse::Ok().json(profiles),
        Err(e) => error_response("Failed to read roommates", e),
    }
}
