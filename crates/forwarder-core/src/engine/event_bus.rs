//! Broadcast channel for forwarder events.

use forwarder_types::ForwarderEvent;
use tokio::sync::broadcast;

/// Fan-out of [`ForwarderEvent`]s to any number of subscribers.
///
/// Publishing with no subscribers returns an error; callers that do not
/// care discard it.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<ForwarderEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per lagging subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ForwarderEvent> {
		self.sender.subscribe()
	}

	pub fn publish(
		&self,
		event: ForwarderEvent,
	) -> Result<(), broadcast::error::SendError<ForwarderEvent>> {
		self.sender.send(event).map(|_| ())
	}
}
