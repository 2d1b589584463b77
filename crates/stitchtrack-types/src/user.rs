//! User account types: roles and suspension state.
//!
//! Authentication itself happens at an external identity provider; this
//! service only stores the role and standing it consults when an actor
//! attempts a gated operation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role claim attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	/// Administers users and the product catalog.
	Admin,
	/// Decides orders and records fulfillment checkpoints.
	Manager,
	/// Places and tracks orders.
	Buyer,
}

impl Role {
	/// Returns the lowercase wire representation of this role.
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Admin => "admin",
			Role::Manager => "manager",
			Role::Buyer => "buyer",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"admin" => Ok(Self::Admin),
			"manager" => Ok(Self::Manager),
			"buyer" => Ok(Self::Buyer),
			_ => Err(()),
		}
	}
}

/// Standing of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
	/// In good standing.
	Active,
	/// Barred from acting until reinstated.
	Suspended,
}

impl fmt::Display for AccountStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AccountStatus::Active => write!(f, "active"),
			AccountStatus::Suspended => write!(f, "suspended"),
		}
	}
}

/// A stored user account.
///
/// Accounts are created on first sight, after the external identity
/// provider has authenticated the user; email is the lookup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
	/// Unique identifier, server-assigned.
	pub id: String,
	/// Email address, unique, the natural lookup key.
	pub email: String,
	/// Display name.
	pub name: String,
	/// Current role claim.
	pub role: Role,
	/// Current standing.
	pub status: AccountStatus,
	/// Reason selected when the account was suspended.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub suspend_reason: Option<String>,
	/// Free-form feedback given with the suspension.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub suspend_feedback: Option<String>,
	/// Unix timestamp (seconds) when the account was first seen.
	pub created_at: u64,
}

impl UserRecord {
	/// Whether the account is currently allowed to act.
	pub fn is_active(&self) -> bool {
		self.status == AccountStatus::Active
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn role_round_trips_through_wire_form() {
		for role in [Role::Admin, Role::Manager, Role::Buyer] {
			assert_eq!(role.as_str().parse::<Role>(), Ok(role));
		}
		assert!("owner".parse::<Role>().is_err());
	}

	#[test]
	fn role_serializes_lowercase() {
		assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
		let role: Role = serde_json::from_str("\"buyer\"").unwrap();
		assert_eq!(role, Role::Buyer);
	}
}
