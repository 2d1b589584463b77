//! Core engine for the stitchtrack order-tracking system.
//!
//! This module orchestrates the order lifecycle: placement, the one-shot
//! approval decision, and fulfillment checkpoint recording. The pure
//! progression rules live in `stitchtrack-progression`; this crate binds
//! them to the order store with bounded check-and-set loops so that two
//! concurrent decisions (or two concurrent checkpoint appends) can never
//! both succeed. User administration and the product catalog live in
//! their own modules.

use crate::access::AccessError;
use crate::event_bus::EventBus;
use rust_decimal::Decimal;
use stitchtrack_config::Config;
use stitchtrack_progression::{ApprovalAction, NextStep, ProgressionError};
use stitchtrack_storage::{StorageError, StorageService, Witness};
use stitchtrack_types::{
	ApprovalStatus, Collection, Order, OrderEvent, PlaceOrderRequest, Role, TrackerEvent,
	TrackingEvent, UserRecord,
};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod access;
pub mod accounts;
pub mod catalog;
pub mod event_bus;

/// Attempts a check-and-set loop makes before giving up.
///
/// The progression rules are re-evaluated against fresh state on every
/// attempt, so a loser of a race either succeeds on the new state or
/// gets a deterministic refusal; the budget only bounds pathological
/// contention.
const CAS_ATTEMPTS: usize = 3;

/// Utility function to truncate an id for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer ids.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 8 {
		id.to_string()
	} else {
		format!("{}..", &id[..8])
	}
}

/// Current time as unix seconds.
fn now() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Error from the order store backend.
	#[error("storage error: {0}")]
	Storage(StorageError),
	/// Deterministic refusal from the progression rules.
	#[error(transparent)]
	Progression(#[from] ProgressionError),
	/// The actor may not perform this operation.
	#[error(transparent)]
	Access(#[from] AccessError),
	/// A referenced entity does not exist.
	#[error("{0}")]
	NotFound(String),
	/// The request is well-formed but fails a business rule.
	#[error("{0}")]
	Validation(String),
	/// A concurrent writer kept winning the check-and-set race.
	#[error("{0}")]
	Conflict(String),
}

impl From<StorageError> for EngineError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::Conflict => {
				EngineError::Conflict("stored record changed during the update".to_string())
			}
			other => EngineError::Storage(other),
		}
	}
}

/// The stitchtrack engine: order store plus progression rules.
///
/// All mutation happens through this type; handlers stay thin and pass
/// the acting user in explicitly for every gated operation.
pub struct TrackerEngine {
	/// Service configuration.
	config: Config,
	/// Order store for persisting state.
	storage: Arc<StorageService>,
	/// Event bus for lifecycle notifications.
	event_bus: EventBus,
}

impl TrackerEngine {
	/// Creates a new engine over the given store.
	pub fn new(config: Config, storage: Arc<StorageService>) -> Self {
		Self {
			config,
			storage,
			event_bus: EventBus::new(1024),
		}
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the order store.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Loads an order together with a check-and-set witness.
	async fn load_order(&self, order_id: &str) -> Result<(Order, Witness), EngineError> {
		self.storage
			.retrieve_with_witness(Collection::Orders.as_str(), order_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					EngineError::NotFound(format!("order {} not found", truncate_id(order_id)))
				}
				other => other.into(),
			})
	}

	/// Places a new order for the acting buyer.
	///
	/// The product reference is validated against the catalog and the
	/// total is computed server-side; the storefront's extra payload is
	/// carried through unchanged. New orders start Pending with an empty
	/// tracking history.
	pub async fn place_order(
		&self,
		actor: &UserRecord,
		request: PlaceOrderRequest,
	) -> Result<Order, EngineError> {
		access::ensure_role(actor, &[Role::Buyer])?;

		let product = self.get_product(&request.product_id).await.map_err(|e| {
			match e {
				EngineError::NotFound(_) => EngineError::Validation(format!(
					"unknown product: {}",
					request.product_id
				)),
				other => other,
			}
		})?;

		if request.quantity == 0 {
			return Err(EngineError::Validation("quantity must be positive".into()));
		}
		if !product.accepts_quantity(request.quantity) {
			return Err(EngineError::Validation(format!(
				"quantity {} is outside the allowed range {}..={}",
				request.quantity, product.minimum_order_quantity, product.available_quantity
			)));
		}

		let timestamp = now();
		let order = Order {
			id: Uuid::new_v4().to_string(),
			created_at: timestamp,
			updated_at: timestamp,
			status: ApprovalStatus::Pending,
			decided_at: None,
			buyer_email: actor.email.clone(),
			product_id: product.id.clone(),
			product_title: product.title.clone(),
			quantity: request.quantity,
			total_price: product.price * Decimal::from(request.quantity),
			extra: request.extra,
			tracking: Vec::new(),
		};

		self.storage
			.insert(Collection::Orders.as_str(), &order.id, &order)
			.await?;

		self.event_bus
			.publish(TrackerEvent::Order(OrderEvent::Placed {
				order_id: order.id.clone(),
				buyer_email: order.buyer_email.clone(),
			}))
			.ok();
		tracing::info!(
			order_id = %truncate_id(&order.id),
			buyer = %order.buyer_email,
			"Order placed"
		);

		Ok(order)
	}

	/// Fetches one order, tracking history included.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, EngineError> {
		let (order, _) = self.load_order(order_id).await?;
		Ok(order)
	}

	/// Lists orders, optionally filtered by status and/or buyer.
	///
	/// Newest first. Filters are applied in memory; both bundled
	/// backends are small-scale stores.
	pub async fn list_orders(
		&self,
		status: Option<ApprovalStatus>,
		buyer: Option<&str>,
	) -> Result<Vec<Order>, EngineError> {
		let mut orders: Vec<Order> = self.storage.list(Collection::Orders.as_str()).await?;
		if let Some(status) = status {
			orders.retain(|order| order.status == status);
		}
		if let Some(buyer) = buyer {
			orders.retain(|order| order.buyer_email == buyer);
		}
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(orders)
	}

	/// Cancels a still-pending order on behalf of its buyer.
	///
	/// Once a manager has decided the order, cancellation is no longer
	/// possible through this service.
	pub async fn cancel_order(&self, actor: &UserRecord, order_id: &str) -> Result<(), EngineError> {
		access::ensure_role(actor, &[Role::Buyer])?;

		let (order, _) = self.load_order(order_id).await?;
		access::ensure_owner(actor, &order)?;
		if order.status != ApprovalStatus::Pending {
			return Err(EngineError::Validation(format!(
				"only pending orders can be cancelled; this order is {}",
				order.status
			)));
		}

		self.storage
			.remove(Collection::Orders.as_str(), order_id)
			.await?;

		self.event_bus
			.publish(TrackerEvent::Order(OrderEvent::Cancelled {
				order_id: order_id.to_string(),
			}))
			.ok();
		tracing::info!(order_id = %truncate_id(order_id), "Order cancelled");

		Ok(())
	}

	/// Applies a manager's approve/reject decision to a pending order.
	///
	/// Runs as a check-and-set loop: the precondition is re-evaluated
	/// against fresh state on every attempt, so of two concurrent
	/// decisions exactly one succeeds and the other gets
	/// `InvalidTransition`.
	pub async fn decide_order(
		&self,
		actor: &UserRecord,
		order_id: &str,
		action: ApprovalAction,
	) -> Result<Order, EngineError> {
		access::ensure_role(actor, &[Role::Manager])?;

		for _ in 0..CAS_ATTEMPTS {
			let (mut order, witness) = self.load_order(order_id).await?;
			let decided = stitchtrack_progression::decide(order.status, action)?;

			let timestamp = now();
			order.status = decided;
			order.decided_at = Some(timestamp);
			order.updated_at = timestamp;

			match self
				.storage
				.swap(Collection::Orders.as_str(), order_id, &witness, &order)
				.await
			{
				Ok(()) => {
					self.event_bus
						.publish(TrackerEvent::Order(OrderEvent::Decided {
							order_id: order.id.clone(),
							status: order.status,
						}))
						.ok();
					tracing::info!(
						order_id = %truncate_id(order_id),
						status = %order.status,
						"Order decided"
					);
					return Ok(order);
				}
				Err(StorageError::Conflict) => continue,
				Err(e) => return Err(e.into()),
			}
		}

		Err(EngineError::Conflict(format!(
			"order {} kept changing underneath the decision; gave up after {} attempts",
			truncate_id(order_id),
			CAS_ATTEMPTS
		)))
	}

	/// Records the next fulfillment checkpoint on an approved order.
	///
	/// The checkpoint is never caller-supplied: the progression rules
	/// compute the single legal next stage from the stored history, and
	/// the append is a check-and-set write. Location and note are
	/// required free-form text.
	pub async fn record_checkpoint(
		&self,
		actor: &UserRecord,
		order_id: &str,
		location: &str,
		note: &str,
	) -> Result<Order, EngineError> {
		access::ensure_role(actor, &[Role::Manager])?;

		let location = location.trim();
		let note = note.trim();
		if location.is_empty() {
			return Err(EngineError::Validation("location is required".into()));
		}
		if note.is_empty() {
			return Err(EngineError::Validation("note is required".into()));
		}

		for _ in 0..CAS_ATTEMPTS {
			let (mut order, witness) = self.load_order(order_id).await?;
			let event = stitchtrack_progression::prepare_event(&order, location, note, now())?;

			order.updated_at = event.recorded_at;
			order.tracking.push(event.clone());

			match self
				.storage
				.swap(Collection::Orders.as_str(), order_id, &witness, &order)
				.await
			{
				Ok(()) => {
					self.event_bus
						.publish(TrackerEvent::Order(OrderEvent::CheckpointRecorded {
							order_id: order.id.clone(),
							checkpoint: event.status,
						}))
						.ok();
					tracing::info!(
						order_id = %truncate_id(order_id),
						checkpoint = %event.status,
						"Checkpoint recorded"
					);
					return Ok(order);
				}
				Err(StorageError::Conflict) => continue,
				Err(e) => return Err(e.into()),
			}
		}

		Err(EngineError::Conflict(format!(
			"order {} kept changing underneath the recording; gave up after {} attempts",
			truncate_id(order_id),
			CAS_ATTEMPTS
		)))
	}

	/// Returns the single legal next step for an order's timeline.
	///
	/// Used by the recording form to pre-fill the next stage, and to
	/// refuse to open once the timeline is complete.
	pub async fn next_checkpoint(&self, order_id: &str) -> Result<NextStep, EngineError> {
		let (order, _) = self.load_order(order_id).await?;
		Ok(stitchtrack_progression::next_checkpoint(&order.tracking)?)
	}

	/// Returns an order's tracking history, oldest first.
	pub async fn tracking_history(
		&self,
		order_id: &str,
	) -> Result<Vec<TrackingEvent>, EngineError> {
		let (order, _) = self.load_order(order_id).await?;
		Ok(order.tracking)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stitchtrack_config::Config;
	use stitchtrack_storage::implementations::memory::MemoryStorage;
	use stitchtrack_types::{AccountStatus, Checkpoint, ProductUpsertRequest};

	fn test_config() -> Config {
		r#"
[service]
id = "stitchtrack-test"

[storage]
primary = "memory"
[storage.implementations.memory]
"#
		.parse()
		.unwrap()
	}

	fn engine() -> TrackerEngine {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		TrackerEngine::new(test_config(), storage)
	}

	fn user(email: &str, role: Role) -> UserRecord {
		UserRecord {
			id: format!("id-{}", email),
			email: email.to_string(),
			name: email.to_string(),
			role,
			status: AccountStatus::Active,
			suspend_reason: None,
			suspend_feedback: None,
			created_at: 0,
		}
	}

	async fn seed_product(engine: &TrackerEngine) -> String {
		let admin = user("admin@example.com", Role::Admin);
		let product = engine
			.create_product(
				&admin,
				ProductUpsertRequest {
					title: "Denim Jacket".to_string(),
					description: "stonewashed".to_string(),
					price: "12.50".parse().unwrap(),
					available_quantity: 500,
					minimum_order_quantity: 10,
					payment_options: vec!["cash-on-delivery".to_string()],
				},
			)
			.await
			.unwrap();
		product.id
	}

	async fn place(engine: &TrackerEngine, buyer: &UserRecord, product_id: &str) -> Order {
		engine
			.place_order(
				buyer,
				PlaceOrderRequest {
					product_id: product_id.to_string(),
					quantity: 50,
					extra: serde_json::Value::Null,
				},
			)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn placed_order_starts_pending_with_server_computed_total() {
		let engine = engine();
		let buyer = user("buyer@example.com", Role::Buyer);
		let product_id = seed_product(&engine).await;

		let order = place(&engine, &buyer, &product_id).await;
		assert_eq!(order.status, ApprovalStatus::Pending);
		assert!(order.tracking.is_empty());
		assert_eq!(order.total_price, "625.00".parse().unwrap());

		let fetched = engine.get_order(&order.id).await.unwrap();
		assert_eq!(fetched.id, order.id);
	}

	#[tokio::test]
	async fn quantity_outside_product_bounds_is_refused() {
		let engine = engine();
		let buyer = user("buyer@example.com", Role::Buyer);
		let product_id = seed_product(&engine).await;

		let too_few = engine
			.place_order(
				&buyer,
				PlaceOrderRequest {
					product_id: product_id.clone(),
					quantity: 5,
					extra: serde_json::Value::Null,
				},
			)
			.await;
		assert!(matches!(too_few, Err(EngineError::Validation(_))));

		let too_many = engine
			.place_order(
				&buyer,
				PlaceOrderRequest {
					product_id,
					quantity: 501,
					extra: serde_json::Value::Null,
				},
			)
			.await;
		assert!(matches!(too_many, Err(EngineError::Validation(_))));
	}

	#[tokio::test]
	async fn decision_is_one_shot() {
		let engine = engine();
		let buyer = user("buyer@example.com", Role::Buyer);
		let manager = user("manager@example.com", Role::Manager);
		let product_id = seed_product(&engine).await;
		let order = place(&engine, &buyer, &product_id).await;

		let approved = engine
			.decide_order(&manager, &order.id, ApprovalAction::Approve)
			.await
			.unwrap();
		assert_eq!(approved.status, ApprovalStatus::Approved);
		assert!(approved.decided_at.is_some());

		// The second decision sees Approved and is refused.
		let again = engine
			.decide_order(&manager, &order.id, ApprovalAction::Reject)
			.await;
		assert!(matches!(
			again,
			Err(EngineError::Progression(ProgressionError::InvalidTransition(
				ApprovalStatus::Approved
			)))
		));
	}

	#[tokio::test]
	async fn rejected_order_refuses_tracking() {
		let engine = engine();
		let buyer = user("buyer@example.com", Role::Buyer);
		let manager = user("manager@example.com", Role::Manager);
		let product_id = seed_product(&engine).await;
		let order = place(&engine, &buyer, &product_id).await;

		engine
			.decide_order(&manager, &order.id, ApprovalAction::Reject)
			.await
			.unwrap();

		let refused = engine
			.record_checkpoint(&manager, &order.id, "Dhaka unit 2", "cutting done")
			.await;
		assert!(matches!(
			refused,
			Err(EngineError::Progression(ProgressionError::NotApproved(
				ApprovalStatus::Rejected
			)))
		));
	}

	#[tokio::test]
	async fn checkpoints_record_in_sequence_until_complete() {
		let engine = engine();
		let buyer = user("buyer@example.com", Role::Buyer);
		let manager = user("manager@example.com", Role::Manager);
		let product_id = seed_product(&engine).await;
		let order = place(&engine, &buyer, &product_id).await;

		engine
			.decide_order(&manager, &order.id, ApprovalAction::Approve)
			.await
			.unwrap();

		assert_eq!(
			engine.next_checkpoint(&order.id).await.unwrap(),
			NextStep::Record(Checkpoint::CuttingCompleted)
		);

		for expected in Checkpoint::all() {
			let updated = engine
				.record_checkpoint(&manager, &order.id, "floor 3", "stage done")
				.await
				.unwrap();
			assert_eq!(updated.tracking.last().unwrap().status, expected);
		}

		assert_eq!(
			engine.next_checkpoint(&order.id).await.unwrap(),
			NextStep::Complete
		);

		let done = engine
			.record_checkpoint(&manager, &order.id, "warehouse", "one more")
			.await;
		assert!(matches!(
			done,
			Err(EngineError::Progression(ProgressionError::AlreadyComplete))
		));

		let history = engine.tracking_history(&order.id).await.unwrap();
		assert_eq!(history.len(), Checkpoint::COUNT);
	}

	#[tokio::test]
	async fn buyer_cannot_decide_and_manager_cannot_place() {
		let engine = engine();
		let buyer = user("buyer@example.com", Role::Buyer);
		let manager = user("manager@example.com", Role::Manager);
		let product_id = seed_product(&engine).await;
		let order = place(&engine, &buyer, &product_id).await;

		let refused = engine
			.decide_order(&buyer, &order.id, ApprovalAction::Approve)
			.await;
		assert!(matches!(refused, Err(EngineError::Access(_))));

		let refused = engine
			.place_order(
				&manager,
				PlaceOrderRequest {
					product_id,
					quantity: 50,
					extra: serde_json::Value::Null,
				},
			)
			.await;
		assert!(matches!(refused, Err(EngineError::Access(_))));
	}

	#[tokio::test]
	async fn suspended_buyer_cannot_place() {
		let engine = engine();
		let mut buyer = user("buyer@example.com", Role::Buyer);
		buyer.status = AccountStatus::Suspended;
		let product_id = seed_product(&engine).await;

		let refused = engine
			.place_order(
				&buyer,
				PlaceOrderRequest {
					product_id,
					quantity: 50,
					extra: serde_json::Value::Null,
				},
			)
			.await;
		assert!(matches!(
			refused,
			Err(EngineError::Access(AccessError::Suspended))
		));
	}

	#[tokio::test]
	async fn cancel_is_owner_only_and_pending_only() {
		let engine = engine();
		let buyer = user("buyer@example.com", Role::Buyer);
		let other = user("other@example.com", Role::Buyer);
		let manager = user("manager@example.com", Role::Manager);
		let product_id = seed_product(&engine).await;
		let order = place(&engine, &buyer, &product_id).await;

		let refused = engine.cancel_order(&other, &order.id).await;
		assert!(matches!(
			refused,
			Err(EngineError::Access(AccessError::NotOwner))
		));

		engine
			.decide_order(&manager, &order.id, ApprovalAction::Approve)
			.await
			.unwrap();
		let too_late = engine.cancel_order(&buyer, &order.id).await;
		assert!(matches!(too_late, Err(EngineError::Validation(_))));

		let second = place(&engine, &buyer, &product_id).await;
		engine.cancel_order(&buyer, &second.id).await.unwrap();
		assert!(matches!(
			engine.get_order(&second.id).await,
			Err(EngineError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn listing_filters_by_status_and_buyer() {
		let engine = engine();
		let buyer = user("buyer@example.com", Role::Buyer);
		let other = user("other@example.com", Role::Buyer);
		let manager = user("manager@example.com", Role::Manager);
		let product_id = seed_product(&engine).await;

		let first = place(&engine, &buyer, &product_id).await;
		let _second = place(&engine, &other, &product_id).await;
		engine
			.decide_order(&manager, &first.id, ApprovalAction::Approve)
			.await
			.unwrap();

		let pending = engine
			.list_orders(Some(ApprovalStatus::Pending), None)
			.await
			.unwrap();
		assert_eq!(pending.len(), 1);

		let approved = engine
			.list_orders(Some(ApprovalStatus::Approved), None)
			.await
			.unwrap();
		assert_eq!(approved.len(), 1);
		assert_eq!(approved[0].id, first.id);

		let mine = engine
			.list_orders(None, Some("buyer@example.com"))
			.await
			.unwrap();
		assert_eq!(mine.len(), 1);
		assert_eq!(mine[0].buyer_email, "buyer@example.com");
	}

	#[tokio::test]
	async fn lost_decision_race_resolves_to_invalid_transition() {
		// Two managers read the same pending order; the slower swap must
		// lose its witness and, on re-read, see a decided order.
		let engine = engine();
		let buyer = user("buyer@example.com", Role::Buyer);
		let manager = user("manager@example.com", Role::Manager);
		let product_id = seed_product(&engine).await;
		let order = place(&engine, &buyer, &product_id).await;

		// Simulate the interleaving by deciding through the engine while
		// holding a stale witness of the pending order.
		let (stale, witness) = engine
			.storage()
			.retrieve_with_witness::<Order>(Collection::Orders.as_str(), &order.id)
			.await
			.unwrap();
		assert_eq!(stale.status, ApprovalStatus::Pending);

		engine
			.decide_order(&manager, &order.id, ApprovalAction::Approve)
			.await
			.unwrap();

		let mut raced = stale.clone();
		raced.status = ApprovalStatus::Rejected;
		let lost = engine
			.storage()
			.swap(Collection::Orders.as_str(), &order.id, &witness, &raced)
			.await;
		assert!(matches!(lost, Err(StorageError::Conflict)));

		// The engine path re-reads fresh state and refuses deterministically.
		let retried = engine
			.decide_order(&manager, &order.id, ApprovalAction::Reject)
			.await;
		assert!(matches!(
			retried,
			Err(EngineError::Progression(ProgressionError::InvalidTransition(_)))
		));
	}
}
