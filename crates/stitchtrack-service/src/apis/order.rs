//! Order endpoints: placement, listing, lookup, cancellation, and the
//! approve/reject decision.

use axum::{
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use serde::Deserialize;
use stitchtrack_progression::ApprovalAction;
use stitchtrack_types::{ApiError, ApprovalStatus, Order, PlaceOrderRequest};

use crate::apis::{into_api_error, resolve_actor, validate_id};
use crate::server::AppState;

/// Query parameters for listing orders.
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
	/// Filter by approval status (Pending, Approved, Rejected).
	pub status: Option<String>,
	/// Filter by buyer email.
	pub buyer: Option<String>,
}

/// Handles POST /api/orders requests.
pub async fn place(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
	let actor = resolve_actor(&state.engine, &headers).await?;
	let order = state
		.engine
		.place_order(&actor, request)
		.await
		.map_err(into_api_error)?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/orders requests.
///
/// Serves the dashboard queues: pending orders for the approval table,
/// approved orders for the tracking table, a buyer's own orders.
pub async fn list(
	State(state): State<AppState>,
	Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
	let status = match query.status.as_deref() {
		None => None,
		Some(raw) => Some(raw.parse::<ApprovalStatus>().map_err(|_| {
			ApiError::BadRequest {
				error_type: "INVALID_STATUS".to_string(),
				message: format!("unknown approval status: {}", raw),
				details: None,
			}
		})?),
	};

	let orders = state
		.engine
		.list_orders(status, query.buyer.as_deref())
		.await
		.map_err(into_api_error)?;
	Ok(Json(orders))
}

/// Handles GET /api/orders/{id} requests.
pub async fn get_by_id(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Order>, ApiError> {
	validate_id(&id, "order")?;
	let order = state.engine.get_order(&id).await.map_err(into_api_error)?;
	Ok(Json(order))
}

/// Handles DELETE /api/orders/{id} requests.
///
/// Buyer cancellation, only while the order is still Pending.
pub async fn cancel(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
	validate_id(&id, "order")?;
	let actor = resolve_actor(&state.engine, &headers).await?;
	state
		.engine
		.cancel_order(&actor, &id)
		.await
		.map_err(into_api_error)?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles PATCH /api/orders/{id}/approve requests.
pub async fn approve(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
	decide(state, headers, id, ApprovalAction::Approve).await
}

/// Handles PATCH /api/orders/{id}/reject requests.
pub async fn reject(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
	decide(state, headers, id, ApprovalAction::Reject).await
}

async fn decide(
	state: AppState,
	headers: HeaderMap,
	id: String,
	action: ApprovalAction,
) -> Result<Json<Order>, ApiError> {
	validate_id(&id, "order")?;
	let actor = resolve_actor(&state.engine, &headers).await?;
	let order = state
		.engine
		.decide_order(&actor, &id, action)
		.await
		.map_err(into_api_error)?;
	Ok(Json(order))
}
