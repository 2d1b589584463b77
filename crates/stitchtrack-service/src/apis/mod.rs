//! HTTP API handler modules, one per resource.
//!
//! Handlers are thin: they resolve the acting user from the gateway
//! header, validate path ids, and delegate to the engine. All engine
//! errors funnel through one status mapping so that the deterministic
//! progression refusals always surface as 422 and never get retried.

use axum::http::HeaderMap;
use stitchtrack_core::{EngineError, TrackerEngine};
use stitchtrack_progression::ProgressionError;
use stitchtrack_types::{ApiError, UserRecord};
use uuid::Uuid;

pub mod order;
pub mod product;
pub mod tracking;
pub mod user;

/// Header carrying the acting user's email, attached by the external
/// auth gateway after it has verified the bearer token.
pub const ACTOR_HEADER: &str = "x-actor-email";

/// Resolves the acting user from the gateway header.
///
/// A missing header is a malformed request; an unknown email means the
/// gateway authenticated someone this service has never seen register,
/// which is refused rather than auto-created.
pub async fn resolve_actor(
	engine: &TrackerEngine,
	headers: &HeaderMap,
) -> Result<UserRecord, ApiError> {
	let email = headers
		.get(ACTOR_HEADER)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.ok_or_else(|| ApiError::BadRequest {
			error_type: "UNKNOWN_ACTOR".to_string(),
			message: format!("missing {} header", ACTOR_HEADER),
			details: None,
		})?;

	engine.get_user(email).await.map_err(|e| match e {
		EngineError::NotFound(_) => ApiError::Forbidden {
			error_type: "UNKNOWN_ACTOR".to_string(),
			message: "no account exists for the acting user".to_string(),
		},
		other => into_api_error(other),
	})
}

/// Validates that a path id is a well-formed UUID.
pub fn validate_id(id: &str, what: &str) -> Result<(), ApiError> {
	if Uuid::parse_str(id).is_err() {
		return Err(ApiError::BadRequest {
			error_type: "INVALID_ID".to_string(),
			message: format!("{} id must be a valid UUID: {}", what, id),
			details: None,
		});
	}
	Ok(())
}

/// Maps engine errors onto the API error envelope.
///
/// Progression refusals are deterministic validation failures (422);
/// `CorruptHistory` is the one exception, surfacing as 500 because it
/// can only mean a store-layer defect.
pub fn into_api_error(err: EngineError) -> ApiError {
	match err {
		EngineError::Storage(e) => {
			tracing::error!(error = %e, "Storage failure");
			ApiError::InternalServerError {
				error_type: "STORAGE_ERROR".to_string(),
				message: "the order store failed".to_string(),
			}
		}
		EngineError::Progression(ProgressionError::CorruptHistory(detail)) => {
			tracing::error!(detail = %detail, "Corrupt tracking history");
			ApiError::InternalServerError {
				error_type: "CORRUPT_HISTORY".to_string(),
				message: "stored tracking history is corrupt".to_string(),
			}
		}
		EngineError::Progression(refusal) => {
			let error_type = match refusal {
				ProgressionError::InvalidTransition(_) => "ALREADY_DECIDED",
				ProgressionError::NotApproved(_) => "NOT_APPROVED",
				ProgressionError::AlreadyComplete => "ALREADY_COMPLETE",
				ProgressionError::CorruptHistory(_) => unreachable!(),
			};
			ApiError::UnprocessableEntity {
				error_type: error_type.to_string(),
				message: refusal.to_string(),
				details: None,
			}
		}
		EngineError::Access(e) => ApiError::Forbidden {
			error_type: "FORBIDDEN".to_string(),
			message: e.to_string(),
		},
		EngineError::NotFound(message) => ApiError::NotFound {
			error_type: "NOT_FOUND".to_string(),
			message,
		},
		EngineError::Validation(message) => ApiError::UnprocessableEntity {
			error_type: "INVALID_REQUEST".to_string(),
			message,
			details: None,
		},
		EngineError::Conflict(message) => ApiError::Conflict {
			error_type: "CONFLICT".to_string(),
			message,
		},
	}
}
