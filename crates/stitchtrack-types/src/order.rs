//! Order and fulfillment-tracking types.
//!
//! This module defines the order record, its approval status, the fixed
//! checkpoint sequence a garment order moves through during fulfillment,
//! and the tracking events recorded against it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Approval state of an order, gating whether fulfillment may begin.
///
/// Every order starts Pending. A manager decides it exactly once; both
/// Approved and Rejected are terminal on the approval axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
	/// Awaiting a manager decision.
	Pending,
	/// Cleared for fulfillment tracking.
	Approved,
	/// Refused; no tracking is ever possible.
	Rejected,
}

impl ApprovalStatus {
	/// Whether a decision has already been recorded.
	pub fn is_decided(&self) -> bool {
		!matches!(self, ApprovalStatus::Pending)
	}
}

impl fmt::Display for ApprovalStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApprovalStatus::Pending => write!(f, "Pending"),
			ApprovalStatus::Approved => write!(f, "Approved"),
			ApprovalStatus::Rejected => write!(f, "Rejected"),
		}
	}
}

impl FromStr for ApprovalStatus {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"Pending" => Ok(Self::Pending),
			"Approved" => Ok(Self::Approved),
			"Rejected" => Ok(Self::Rejected),
			_ => Err(()),
		}
	}
}

/// One named stage in the fixed fulfillment sequence.
///
/// The sequence is a configuration constant with a total order; the rank
/// mapping below is the single source of truth for checkpoint ordering,
/// so a malformed history is detectable exhaustively at compile time
/// rather than by string lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Checkpoint {
	#[serde(rename = "Cutting Completed")]
	CuttingCompleted,
	#[serde(rename = "Sewing Started")]
	SewingStarted,
	Finishing,
	#[serde(rename = "QC Checked")]
	QcChecked,
	Packed,
	Shipped,
	#[serde(rename = "Out for Delivery")]
	OutForDelivery,
}

impl Checkpoint {
	/// Number of checkpoints in the fulfillment sequence.
	pub const COUNT: usize = 7;

	/// Position of this checkpoint in the fixed sequence, 0-based.
	pub fn rank(&self) -> usize {
		match self {
			Checkpoint::CuttingCompleted => 0,
			Checkpoint::SewingStarted => 1,
			Checkpoint::Finishing => 2,
			Checkpoint::QcChecked => 3,
			Checkpoint::Packed => 4,
			Checkpoint::Shipped => 5,
			Checkpoint::OutForDelivery => 6,
		}
	}

	/// The checkpoint at the given rank, or None past the end of the sequence.
	pub fn from_rank(rank: usize) -> Option<Self> {
		match rank {
			0 => Some(Checkpoint::CuttingCompleted),
			1 => Some(Checkpoint::SewingStarted),
			2 => Some(Checkpoint::Finishing),
			3 => Some(Checkpoint::QcChecked),
			4 => Some(Checkpoint::Packed),
			5 => Some(Checkpoint::Shipped),
			6 => Some(Checkpoint::OutForDelivery),
			_ => None,
		}
	}

	/// Returns the display name of this checkpoint.
	pub fn as_str(&self) -> &'static str {
		match self {
			Checkpoint::CuttingCompleted => "Cutting Completed",
			Checkpoint::SewingStarted => "Sewing Started",
			Checkpoint::Finishing => "Finishing",
			Checkpoint::QcChecked => "QC Checked",
			Checkpoint::Packed => "Packed",
			Checkpoint::Shipped => "Shipped",
			Checkpoint::OutForDelivery => "Out for Delivery",
		}
	}

	/// Returns an iterator over the full sequence in rank order.
	pub fn all() -> impl Iterator<Item = Self> {
		(0..Self::COUNT).filter_map(Self::from_rank)
	}

	/// Whether this is the final checkpoint of the sequence.
	pub fn is_last(&self) -> bool {
		self.rank() + 1 == Self::COUNT
	}
}

impl fmt::Display for Checkpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Checkpoint {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|c| c.as_str() == s).ok_or(())
	}
}

/// A timestamped record of one checkpoint being reached.
///
/// Location and note are free-form text supplied by the recording
/// manager; they are presence-validated only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
	/// The checkpoint reached.
	pub status: Checkpoint,
	/// Where the stage was completed.
	pub location: String,
	/// Free-form note from the recording actor.
	pub note: String,
	/// Unix timestamp (seconds) at which the event was recorded.
	pub recorded_at: u64,
}

/// A garment order with its approval state and tracking history.
///
/// The buyer/product fields are carried through unchanged by the
/// progression engine; only `status` and `tracking` are ever mutated
/// after placement, and `tracking` is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique identifier, server-assigned at placement, immutable.
	pub id: String,
	/// Unix timestamp (seconds) when this order was placed.
	pub created_at: u64,
	/// Unix timestamp (seconds) when this order was last updated.
	pub updated_at: u64,
	/// Current approval status.
	pub status: ApprovalStatus,
	/// Unix timestamp (seconds) of the approve/reject decision.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub decided_at: Option<u64>,
	/// Buyer identity as reported by the external auth gateway.
	pub buyer_email: String,
	/// Referenced product id.
	pub product_id: String,
	/// Product title snapshot taken at placement time.
	pub product_title: String,
	/// Ordered quantity, validated against the product's bounds.
	pub quantity: u32,
	/// Server-computed total (unit price * quantity).
	pub total_price: Decimal,
	/// Opaque storefront payload, passed through unchanged.
	#[serde(default)]
	pub extra: serde_json::Value,
	/// Tracking history, insertion-ordered, append-only.
	#[serde(default)]
	pub tracking: Vec<TrackingEvent>,
}

impl Order {
	/// The checkpoint statuses recorded so far, in insertion order.
	pub fn recorded_statuses(&self) -> Vec<Checkpoint> {
		self.tracking.iter().map(|event| event.status).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn checkpoint_ranks_round_trip() {
		for checkpoint in Checkpoint::all() {
			assert_eq!(Checkpoint::from_rank(checkpoint.rank()), Some(checkpoint));
		}
		assert_eq!(Checkpoint::from_rank(Checkpoint::COUNT), None);
	}

	#[test]
	fn checkpoint_sequence_is_total_order() {
		let ranks: Vec<usize> = Checkpoint::all().map(|c| c.rank()).collect();
		assert_eq!(ranks, (0..Checkpoint::COUNT).collect::<Vec<_>>());
		assert!(Checkpoint::OutForDelivery.is_last());
		assert!(!Checkpoint::Shipped.is_last());
	}

	#[test]
	fn checkpoint_serde_uses_display_names() {
		let json = serde_json::to_string(&Checkpoint::QcChecked).unwrap();
		assert_eq!(json, "\"QC Checked\"");
		let back: Checkpoint = serde_json::from_str("\"Out for Delivery\"").unwrap();
		assert_eq!(back, Checkpoint::OutForDelivery);
	}

	#[test]
	fn checkpoint_parses_from_display_name() {
		for checkpoint in Checkpoint::all() {
			assert_eq!(checkpoint.as_str().parse::<Checkpoint>(), Ok(checkpoint));
		}
		assert!("Dyeing".parse::<Checkpoint>().is_err());
	}

	#[test]
	fn approval_status_decided() {
		assert!(!ApprovalStatus::Pending.is_decided());
		assert!(ApprovalStatus::Approved.is_decided());
		assert!(ApprovalStatus::Rejected.is_decided());
	}
}
