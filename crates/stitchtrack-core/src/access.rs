//! Role and standing checks for gated operations.
//!
//! The role is passed in explicitly with the acting user; nothing here
//! reaches for ambient identity state. Who the actor *is* was settled
//! by the external identity provider before the request arrived.

use stitchtrack_types::{Order, Role, UserRecord};
use thiserror::Error;

/// Errors raised when an actor may not perform an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
	/// The actor's role is not in the allowed set.
	#[error("requires {0} role")]
	RoleRequired(String),
	/// The actor's account is suspended.
	#[error("account is suspended")]
	Suspended,
	/// The actor does not own the order they tried to act on.
	#[error("order belongs to another buyer")]
	NotOwner,
}

/// Ensures the actor's account is in good standing.
pub fn ensure_active(actor: &UserRecord) -> Result<(), AccessError> {
	if actor.is_active() {
		Ok(())
	} else {
		Err(AccessError::Suspended)
	}
}

/// Ensures the actor is active and holds one of the allowed roles.
pub fn ensure_role(actor: &UserRecord, allowed: &[Role]) -> Result<(), AccessError> {
	ensure_active(actor)?;
	if allowed.contains(&actor.role) {
		Ok(())
	} else {
		let names: Vec<&str> = allowed.iter().map(Role::as_str).collect();
		Err(AccessError::RoleRequired(names.join(" or ")))
	}
}

/// Ensures the actor is the buyer an order belongs to.
pub fn ensure_owner(actor: &UserRecord, order: &Order) -> Result<(), AccessError> {
	if actor.email == order.buyer_email {
		Ok(())
	} else {
		Err(AccessError::NotOwner)
	}
}
