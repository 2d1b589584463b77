//! Tracking endpoints: checkpoint recording, the timeline, and the
//! next-checkpoint lookup the recording form pre-fills from.

use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use stitchtrack_progression::NextStep;
use stitchtrack_types::{
	ApiError, NextCheckpointResponse, RecordTrackingRequest, TrackingEvent,
};

use crate::apis::{into_api_error, resolve_actor, validate_id};
use crate::server::AppState;

/// Handles POST /api/tracking/{id} requests.
///
/// The checkpoint is filled in server-side from the order's history;
/// the body only carries location and note. Responds with the newly
/// recorded event.
pub async fn record(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<RecordTrackingRequest>,
) -> Result<(StatusCode, Json<TrackingEvent>), ApiError> {
	validate_id(&id, "order")?;
	let actor = resolve_actor(&state.engine, &headers).await?;

	let order = state
		.engine
		.record_checkpoint(&actor, &id, &request.location, &request.note)
		.await
		.map_err(into_api_error)?;

	// The appended event is by construction the last one.
	let event = order
		.tracking
		.last()
		.cloned()
		.ok_or_else(|| ApiError::InternalServerError {
			error_type: "MISSING_EVENT".to_string(),
			message: "recorded event missing from the stored order".to_string(),
		})?;

	Ok((StatusCode::CREATED, Json(event)))
}

/// Handles GET /api/tracking/{id} requests.
pub async fn history(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Vec<TrackingEvent>>, ApiError> {
	validate_id(&id, "order")?;
	let events = state
		.engine
		.tracking_history(&id)
		.await
		.map_err(into_api_error)?;
	Ok(Json(events))
}

/// Handles GET /api/tracking/{id}/next requests.
///
/// Lets the recording form lock the next stage, and refuse to open at
/// all once the timeline is complete.
pub async fn next(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<NextCheckpointResponse>, ApiError> {
	validate_id(&id, "order")?;
	let step = state
		.engine
		.next_checkpoint(&id)
		.await
		.map_err(into_api_error)?;

	let response = match step {
		NextStep::Record(checkpoint) => NextCheckpointResponse {
			complete: false,
			next: Some(checkpoint),
		},
		NextStep::Complete => NextCheckpointResponse {
			complete: true,
			next: None,
		},
	};
	Ok(Json(response))
}
