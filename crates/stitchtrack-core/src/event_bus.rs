//! Broadcast event bus for lifecycle notifications.
//!
//! Components publish fire-and-forget events here; subscribers (the
//! service's event logger, tests) receive their own broadcast stream.
//! Publishing never blocks and a bus with no subscribers drops events.

use stitchtrack_types::TrackerEvent;
use tokio::sync::broadcast;

/// Cloneable handle to the shared broadcast channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<TrackerEvent>,
}

impl EventBus {
	/// Creates a new bus retaining up to `capacity` undelivered events
	/// per subscriber before older ones are dropped.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Fails only when nobody is subscribed, which callers treat as
	/// not-an-error via `.ok()`.
	pub fn publish(
		&self,
		event: TrackerEvent,
	) -> Result<(), broadcast::error::SendError<TrackerEvent>> {
		self.sender.send(event).map(|_| ())
	}

	/// Creates a new subscription to the event stream.
	pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
		self.sender.subscribe()
	}
}
