//! Fulfillment progression engine.
//!
//! Pure decision logic for the two per-order sub-processes: the one-shot
//! approval decision (Pending -> Approved | Rejected) and the fixed
//! checkpoint sequence recorded during fulfillment. The engine holds no
//! state and performs no I/O; the clock is passed in and all persistence
//! is the order store's concern. Callers re-run these checks against
//! fresh state after any lost write race, which is what makes concurrent
//! decide/append calls safe end to end.

use stitchtrack_types::{ApprovalStatus, Checkpoint, Order, TrackingEvent};
use thiserror::Error;

/// Errors raised by the progression engine.
///
/// All four are deterministic validation failures: retrying the same
/// request can never succeed, so callers report them to the acting user
/// instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressionError {
	/// Approval decision attempted on an already-decided order.
	#[error("order already decided: status is {0}")]
	InvalidTransition(ApprovalStatus),
	/// Checkpoint recording attempted on a non-approved order.
	#[error("tracking requires an approved order: status is {0}")]
	NotApproved(ApprovalStatus),
	/// Checkpoint recording attempted after the final checkpoint.
	#[error("tracking is already complete")]
	AlreadyComplete,
	/// Recorded history is not a gap-free prefix of the fixed sequence.
	/// Indicates a store-layer defect, never user error.
	#[error("corrupt tracking history: {0}")]
	CorruptHistory(String),
}

/// A manager's decision on a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
	Approve,
	Reject,
}

/// The single legal next step for an order's tracking timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
	/// The checkpoint the next recording must carry.
	Record(Checkpoint),
	/// All checkpoints recorded; the timeline is closed.
	Complete,
}

/// Applies an approval decision to the given status.
///
/// Only a Pending order may be decided; both outcomes are terminal.
/// The caller is responsible for the atomic check-and-set against the
/// store so that two concurrent decisions cannot both observe Pending.
pub fn decide(
	status: ApprovalStatus,
	action: ApprovalAction,
) -> Result<ApprovalStatus, ProgressionError> {
	match status {
		ApprovalStatus::Pending => Ok(match action {
			ApprovalAction::Approve => ApprovalStatus::Approved,
			ApprovalAction::Reject => ApprovalStatus::Rejected,
		}),
		decided => Err(ProgressionError::InvalidTransition(decided)),
	}
}

/// Computes the single legal next checkpoint for a tracking history.
///
/// The recorded statuses must form a strict, gap-free prefix of the
/// fixed sequence: the event at index `i` must carry the rank-`i`
/// checkpoint. Any deviation (gap, duplicate, reordering) is reported
/// as `CorruptHistory` rather than silently accepted.
pub fn next_checkpoint(history: &[TrackingEvent]) -> Result<NextStep, ProgressionError> {
	for (index, event) in history.iter().enumerate() {
		let expected = Checkpoint::from_rank(index).ok_or_else(|| {
			ProgressionError::CorruptHistory(format!(
				"history has {} events but the sequence has {}",
				history.len(),
				Checkpoint::COUNT
			))
		})?;
		if event.status != expected {
			return Err(ProgressionError::CorruptHistory(format!(
				"expected '{}' at position {}, found '{}'",
				expected, index, event.status
			)));
		}
	}

	match Checkpoint::from_rank(history.len()) {
		Some(next) => Ok(NextStep::Record(next)),
		None => Ok(NextStep::Complete),
	}
}

/// Constructs the next tracking event for an order.
///
/// Preconditions: the order is Approved and its timeline is not yet
/// complete. On success the returned event carries the next checkpoint
/// in the sequence and the supplied recording time; appending it is the
/// caller's check-and-set write.
pub fn prepare_event(
	order: &Order,
	location: impl Into<String>,
	note: impl Into<String>,
	now: u64,
) -> Result<TrackingEvent, ProgressionError> {
	if order.status != ApprovalStatus::Approved {
		return Err(ProgressionError::NotApproved(order.status));
	}

	match next_checkpoint(&order.tracking)? {
		NextStep::Record(checkpoint) => Ok(TrackingEvent {
			status: checkpoint,
			location: location.into(),
			note: note.into(),
			recorded_at: now,
		}),
		NextStep::Complete => Err(ProgressionError::AlreadyComplete),
	}
}
