//! Lifecycle events for inter-component communication.
//!
//! Events flow through a broadcast bus so that components can observe
//! state changes without holding references into the engine. Dashboards
//! consume state by polling the HTTP API; the bus stays internal.

use crate::{AccountStatus, ApprovalStatus, Checkpoint, Role};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all tracker events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrackerEvent {
	/// Events from the order lifecycle.
	Order(OrderEvent),
	/// Events from user administration.
	User(UserEvent),
}

/// Events related to the order lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A buyer placed a new order.
	Placed { order_id: String, buyer_email: String },
	/// A manager decided a pending order.
	Decided {
		order_id: String,
		status: ApprovalStatus,
	},
	/// A manager recorded the next fulfillment checkpoint.
	CheckpointRecorded {
		order_id: String,
		checkpoint: Checkpoint,
	},
	/// A buyer cancelled a still-pending order.
	Cancelled { order_id: String },
}

/// Events related to user administration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserEvent {
	/// An account was created on first sight.
	Registered { email: String },
	/// An admin changed an account's role.
	RoleUpdated { email: String, role: Role },
	/// An admin suspended or reinstated an account.
	StatusUpdated {
		email: String,
		status: AccountStatus,
	},
}
