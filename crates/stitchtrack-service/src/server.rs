//! HTTP server for the stitchtrack API.
//!
//! Builds the axum router over the engine and serves it. Handlers live
//! in the `apis` modules, one per resource; this module only does
//! wiring, CORS, and the listener.

use axum::{
	http::HeaderValue,
	routing::{get, patch, post},
	Router,
};
use stitchtrack_config::ApiConfig;
use stitchtrack_core::TrackerEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::apis::{order, product, tracking, user};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the engine for processing requests.
	pub engine: Arc<TrackerEngine>,
}

/// Builds the API router with all routes and middleware.
pub fn build_router(api_config: &ApiConfig, engine: Arc<TrackerEngine>) -> Router {
	let cors = if api_config.allowed_origins.is_empty() {
		CorsLayer::permissive()
	} else {
		let origins: Vec<HeaderValue> = api_config
			.allowed_origins
			.iter()
			.filter_map(|origin| origin.parse().ok())
			.collect();
		CorsLayer::new()
			.allow_origin(AllowOrigin::list(origins))
			.allow_methods(Any)
			.allow_headers(Any)
	};

	let state = AppState { engine };

	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(order::place).get(order::list))
				.route(
					"/orders/{id}",
					get(order::get_by_id).delete(order::cancel),
				)
				.route("/orders/{id}/approve", patch(order::approve))
				.route("/orders/{id}/reject", patch(order::reject))
				.route(
					"/tracking/{id}",
					post(tracking::record).get(tracking::history),
				)
				.route("/tracking/{id}/next", get(tracking::next))
				.route("/users", post(user::register).get(user::list))
				.route("/users/{email}/role", get(user::role))
				.route("/users/{email}/status", get(user::status))
				.route("/users/update-role/{id}", patch(user::update_role))
				.route("/users/update-status/{id}", patch(user::update_status))
				.route("/users/{id}", axum::routing::delete(user::remove))
				.route("/products", post(product::create).get(product::list))
				.route(
					"/products/{id}",
					get(product::get_by_id)
						.put(product::update)
						.delete(product::remove),
				),
		)
		.layer(ServiceBuilder::new().layer(cors))
		.with_state(state)
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<TrackerEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(&api_config, engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("stitchtrack API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::apis::{order, product, tracking, user, ACTOR_HEADER};
	use axum::extract::{Path, Query, State};
	use axum::http::HeaderMap;
	use axum::response::Json;
	use stitchtrack_config::Config;
	use stitchtrack_storage::{implementations::memory::MemoryStorage, StorageService};
	use stitchtrack_types::{
		Checkpoint, Collection, PlaceOrderRequest, ProductUpsertRequest, RecordTrackingRequest,
		RegisterUserRequest, Role,
	};

	fn test_config() -> Config {
		r#"
[service]
id = "stitchtrack-test"

[storage]
primary = "memory"
[storage.implementations.memory]

[api]
enabled = true
"#
		.parse()
		.unwrap()
	}

	fn state() -> AppState {
		let config = test_config();
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		AppState {
			engine: Arc::new(TrackerEngine::new(config, storage)),
		}
	}

	fn headers_for(email: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert(ACTOR_HEADER, email.parse().unwrap());
		headers
	}

	/// Registers a user and, when the role differs from the default,
	/// promotes it directly in the store the way a deployment seed does.
	async fn seed_user(state: &AppState, email: &str, role: Role) {
		let Json(mut user) = user::register(
			State(state.clone()),
			Json(RegisterUserRequest {
				email: email.to_string(),
				name: email.to_string(),
			}),
		)
		.await
		.unwrap();

		if user.role != role {
			user.role = role;
			state
				.engine
				.storage()
				.store(Collection::Users.as_str(), &user.email, &user)
				.await
				.unwrap();
		}
	}

	async fn seed_product(state: &AppState) -> String {
		let (_, Json(created)) = product::create(
			State(state.clone()),
			headers_for("admin@example.com"),
			Json(ProductUpsertRequest {
				title: "Denim Jacket".to_string(),
				description: String::new(),
				price: "12.50".parse().unwrap(),
				available_quantity: 500,
				minimum_order_quantity: 10,
				payment_options: vec![],
			}),
		)
		.await
		.unwrap();
		created.id
	}

	#[test]
	fn router_builds_with_and_without_origin_list() {
		let state = state();
		let api_config = test_config().api.unwrap();
		let _ = build_router(&api_config, Arc::clone(&state.engine));

		let mut restricted = api_config;
		restricted.allowed_origins = vec!["https://shop.example.com".to_string()];
		let _ = build_router(&restricted, state.engine);
	}

	#[tokio::test]
	async fn full_lifecycle_through_the_handlers() {
		let state = state();
		seed_user(&state, "admin@example.com", Role::Admin).await;
		seed_user(&state, "manager@example.com", Role::Manager).await;
		seed_user(&state, "buyer@example.com", Role::Buyer).await;
		let product_id = seed_product(&state).await;

		// Buyer places an order.
		let (status, Json(order)) = order::place(
			State(state.clone()),
			headers_for("buyer@example.com"),
			Json(PlaceOrderRequest {
				product_id,
				quantity: 50,
				extra: serde_json::Value::Null,
			}),
		)
		.await
		.unwrap();
		assert_eq!(status, axum::http::StatusCode::CREATED);

		// It shows up in the pending queue.
		let Json(pending) = order::list(
			State(state.clone()),
			Query(order::ListOrdersQuery {
				status: Some("Pending".to_string()),
				buyer: None,
			}),
		)
		.await
		.unwrap();
		assert_eq!(pending.len(), 1);

		// Manager approves; a second decision is refused with 422.
		let Json(approved) = order::approve(
			Path(order.id.clone()),
			State(state.clone()),
			headers_for("manager@example.com"),
		)
		.await
		.unwrap();
		assert_eq!(approved.status.to_string(), "Approved");

		let second = order::reject(
			Path(order.id.clone()),
			State(state.clone()),
			headers_for("manager@example.com"),
		)
		.await;
		assert_eq!(second.err().unwrap().status_code(), 422);

		// The recording form asks what comes next.
		let Json(next) = tracking::next(Path(order.id.clone()), State(state.clone()))
			.await
			.unwrap();
		assert!(!next.complete);
		assert_eq!(next.next, Some(Checkpoint::CuttingCompleted));

		// Manager records the first checkpoint.
		let (status, Json(event)) = tracking::record(
			Path(order.id.clone()),
			State(state.clone()),
			headers_for("manager@example.com"),
			Json(RecordTrackingRequest {
				location: "Dhaka unit 2".to_string(),
				note: "cutting done".to_string(),
			}),
		)
		.await
		.unwrap();
		assert_eq!(status, axum::http::StatusCode::CREATED);
		assert_eq!(event.status, Checkpoint::CuttingCompleted);

		// The buyer's timeline shows it.
		let Json(history) = tracking::history(Path(order.id.clone()), State(state.clone()))
			.await
			.unwrap();
		assert_eq!(history.len(), 1);

		// A buyer may not record checkpoints.
		let refused = tracking::record(
			Path(order.id.clone()),
			State(state.clone()),
			headers_for("buyer@example.com"),
			Json(RecordTrackingRequest {
				location: "anywhere".to_string(),
				note: "nope".to_string(),
			}),
		)
		.await;
		assert_eq!(refused.err().unwrap().status_code(), 403);
	}

	#[tokio::test]
	async fn unknown_actor_is_refused() {
		let state = state();
		seed_user(&state, "admin@example.com", Role::Admin).await;
		let product_id = seed_product(&state).await;

		let refused = order::place(
			State(state.clone()),
			headers_for("ghost@example.com"),
			Json(PlaceOrderRequest {
				product_id,
				quantity: 50,
				extra: serde_json::Value::Null,
			}),
		)
		.await;
		assert_eq!(refused.err().unwrap().status_code(), 403);

		let missing_header = user::list(State(state.clone()), HeaderMap::new()).await;
		assert_eq!(missing_header.err().unwrap().status_code(), 400);
	}

	#[tokio::test]
	async fn malformed_order_id_is_a_bad_request() {
		let state = state();
		let refused = order::get_by_id(Path("not-a-uuid".to_string()), State(state)).await;
		assert_eq!(refused.err().unwrap().status_code(), 400);
	}

	#[tokio::test]
	async fn status_lookup_serves_the_poll_loop() {
		let state = state();
		seed_user(&state, "buyer@example.com", Role::Buyer).await;

		let Json(status) = user::status(
			Path("buyer@example.com".to_string()),
			State(state.clone()),
		)
		.await
		.unwrap();
		assert_eq!(
			serde_json::to_string(&status.status).unwrap(),
			"\"active\""
		);

		let Json(role) = user::role(Path("buyer@example.com".to_string()), State(state))
			.await
			.unwrap();
		assert_eq!(serde_json::to_string(&role.role).unwrap(), "\"buyer\"");
	}
}
