//! API types for the stitchtrack HTTP API.
//!
//! This module defines the shared error envelope returned by every
//! endpoint, with the HTTP status mapping for the deterministic
//! validation failures the progression engine raises. None of these
//! errors are retryable; callers report them to the acting user.

use crate::{AccountStatus, Checkpoint, Role};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body for placing an order.
///
/// Buyer identity comes from the actor header, never from the body;
/// price totals are computed server-side from the referenced product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
	/// Referenced product id.
	pub product_id: String,
	/// Requested quantity.
	pub quantity: u32,
	/// Opaque storefront payload, stored with the order unchanged.
	#[serde(default)]
	pub extra: serde_json::Value,
}

/// Request body for recording the next fulfillment checkpoint.
///
/// The checkpoint itself is never client-supplied; the server fills it
/// from the order's tracking history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTrackingRequest {
	/// Where the stage was completed.
	pub location: String,
	/// Free-form note from the recording manager.
	pub note: String,
}

/// Response for the next-checkpoint lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextCheckpointResponse {
	/// True once all checkpoints have been recorded.
	pub complete: bool,
	/// The checkpoint the next recording will carry, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub next: Option<Checkpoint>,
}

/// Request body for registering a user after external sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
	pub email: String,
	pub name: String,
}

/// Request body for changing a user's role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
	pub role: Role,
}

/// Request body for suspending or reinstating a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
	pub status: AccountStatus,
	#[serde(default)]
	pub reason: Option<String>,
	#[serde(default)]
	pub feedback: Option<String>,
}

/// Response for the role lookup used by storefront route guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResponse {
	pub role: Role,
}

/// Response for the suspension lookup polled by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
	pub status: AccountStatus,
}

/// Request body for creating or replacing a catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpsertRequest {
	pub title: String,
	#[serde(default)]
	pub description: String,
	pub price: Decimal,
	pub available_quantity: u32,
	pub minimum_order_quantity: u32,
	#[serde(default)]
	pub payment_options: Vec<String>,
}

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
	/// Bad request with validation errors (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Actor lacks the role or standing for the operation (403)
	Forbidden { error_type: String, message: String },
	/// Requested entity does not exist (404)
	NotFound { error_type: String, message: String },
	/// Concurrent update lost its check-and-set race (409)
	Conflict { error_type: String, message: String },
	/// Deterministic business-rule refusal, never retried (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl ApiError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::Forbidden { .. } => 403,
			ApiError::NotFound { .. } => 404,
			ApiError::Conflict { .. } => 409,
			ApiError::UnprocessableEntity { .. } => 422,
			ApiError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			ApiError::BadRequest {
				error_type,
				message,
				details,
			}
			| ApiError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
			},
			ApiError::Forbidden {
				error_type,
				message,
			}
			| ApiError::NotFound {
				error_type,
				message,
			}
			| ApiError::Conflict {
				error_type,
				message,
			}
			| ApiError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
			},
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			ApiError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
			ApiError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			ApiError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			ApiError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			}
			ApiError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			}
		}
	}
}

impl std::error::Error for ApiError {}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		let error_response = self.to_error_response();
		(status, Json(error_response)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_codes_match_variants() {
		let not_found = ApiError::NotFound {
			error_type: "ORDER_NOT_FOUND".to_string(),
			message: "no such order".to_string(),
		};
		assert_eq!(not_found.status_code(), 404);

		let refused = ApiError::UnprocessableEntity {
			error_type: "ALREADY_COMPLETE".to_string(),
			message: "tracking already complete".to_string(),
			details: None,
		};
		assert_eq!(refused.status_code(), 422);
	}

	#[test]
	fn error_response_carries_code_and_message() {
		let err = ApiError::Forbidden {
			error_type: "ROLE_REQUIRED".to_string(),
			message: "requires manager role".to_string(),
		};
		let body = err.to_error_response();
		assert_eq!(body.error, "ROLE_REQUIRED");
		assert_eq!(body.message, "requires manager role");
		assert!(body.details.is_none());
	}
}
