//! Product catalog endpoints.

use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use stitchtrack_types::{ApiError, ProductRecord, ProductUpsertRequest};

use crate::apis::{into_api_error, resolve_actor, validate_id};
use crate::server::AppState;

/// Handles POST /api/products requests. Admin or manager.
pub async fn create(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<ProductUpsertRequest>,
) -> Result<(StatusCode, Json<ProductRecord>), ApiError> {
	let actor = resolve_actor(&state.engine, &headers).await?;
	let product = state
		.engine
		.create_product(&actor, request)
		.await
		.map_err(into_api_error)?;
	Ok((StatusCode::CREATED, Json(product)))
}

/// Handles GET /api/products requests.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProductRecord>>, ApiError> {
	let products = state.engine.list_products().await.map_err(into_api_error)?;
	Ok(Json(products))
}

/// Handles GET /api/products/{id} requests.
pub async fn get_by_id(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<ProductRecord>, ApiError> {
	validate_id(&id, "product")?;
	let product = state
		.engine
		.get_product(&id)
		.await
		.map_err(into_api_error)?;
	Ok(Json(product))
}

/// Handles PUT /api/products/{id} requests. Admin or manager.
pub async fn update(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<ProductUpsertRequest>,
) -> Result<Json<ProductRecord>, ApiError> {
	validate_id(&id, "product")?;
	let actor = resolve_actor(&state.engine, &headers).await?;
	let product = state
		.engine
		.update_product(&actor, &id, request)
		.await
		.map_err(into_api_error)?;
	Ok(Json(product))
}

/// Handles DELETE /api/products/{id} requests. Admin or manager.
pub async fn remove(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
	validate_id(&id, "product")?;
	let actor = resolve_actor(&state.engine, &headers).await?;
	state
		.engine
		.delete_product(&actor, &id)
		.await
		.map_err(into_api_error)?;
	Ok(StatusCode::NO_CONTENT)
}
