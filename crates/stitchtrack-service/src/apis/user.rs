//! User endpoints: registration after external sign-in, the role and
//! standing lookups the storefront guards poll, and admin management.

use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use stitchtrack_types::{
	ApiError, RegisterUserRequest, RoleResponse, StatusResponse, UpdateRoleRequest,
	UpdateStatusRequest, UserRecord,
};

use crate::apis::{into_api_error, resolve_actor, validate_id};
use crate::server::AppState;

/// Handles POST /api/users requests.
///
/// Upsert-on-first-sight registration; the storefront calls this after
/// every external sign-in, so re-registering is a no-op.
pub async fn register(
	State(state): State<AppState>,
	Json(request): Json<RegisterUserRequest>,
) -> Result<Json<UserRecord>, ApiError> {
	let user = state
		.engine
		.register_user(&request.email, &request.name)
		.await
		.map_err(into_api_error)?;
	Ok(Json(user))
}

/// Handles GET /api/users requests. Admin only.
pub async fn list(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<UserRecord>>, ApiError> {
	let actor = resolve_actor(&state.engine, &headers).await?;
	let users = state
		.engine
		.list_users(&actor)
		.await
		.map_err(into_api_error)?;
	Ok(Json(users))
}

/// Handles GET /api/users/{email}/role requests.
///
/// Serves the storefront's route guards.
pub async fn role(
	Path(email): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<RoleResponse>, ApiError> {
	let user = state
		.engine
		.get_user(&email)
		.await
		.map_err(into_api_error)?;
	Ok(Json(RoleResponse { role: user.role }))
}

/// Handles GET /api/users/{email}/status requests.
///
/// Polled on a short interval by the storefront, so this stays a
/// single keyed read.
pub async fn status(
	Path(email): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
	let user = state
		.engine
		.get_user(&email)
		.await
		.map_err(into_api_error)?;
	Ok(Json(StatusResponse {
		status: user.status,
	}))
}

/// Handles PATCH /api/users/update-role/{id} requests. Admin only.
pub async fn update_role(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<UpdateRoleRequest>,
) -> Result<Json<UserRecord>, ApiError> {
	validate_id(&id, "user")?;
	let actor = resolve_actor(&state.engine, &headers).await?;
	let user = state
		.engine
		.update_role(&actor, &id, request.role)
		.await
		.map_err(into_api_error)?;
	Ok(Json(user))
}

/// Handles PATCH /api/users/update-status/{id} requests. Admin only.
pub async fn update_status(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UserRecord>, ApiError> {
	validate_id(&id, "user")?;
	let actor = resolve_actor(&state.engine, &headers).await?;
	let user = state
		.engine
		.update_status(
			&actor,
			&id,
			request.status,
			request.reason,
			request.feedback,
		)
		.await
		.map_err(into_api_error)?;
	Ok(Json(user))
}

/// Handles DELETE /api/users/{id} requests. Admin only.
pub async fn remove(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
	validate_id(&id, "user")?;
	let actor = resolve_actor(&state.engine, &headers).await?;
	state
		.engine
		.delete_user(&actor, &id)
		.await
		.map_err(into_api_error)?;
	Ok(StatusCode::NO_CONTENT)
}
