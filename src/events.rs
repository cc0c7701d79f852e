//!
//! Typed in-process publish/subscribe used for session and transaction
//! lifecycle notifications.
//!
//! Subscribers are invoked synchronously on every published event, so
//! observers of connection state never need to poll. Each subscription is a
//! guard that removes its listener when dropped, so reconnect cycles cannot
//! leak listeners.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
	listeners: Mutex<Vec<(u64, Listener<E>)>>,
	next_id: AtomicU64,
}

/// Broadcast bus for one event type.
pub struct EventBus<E> {
	inner: Arc<Registry<E>>,
}

impl<E> Clone for EventBus<E> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<E> Default for EventBus<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<E> EventBus<E> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Registry {
				listeners: Mutex::new(Vec::new()),
				next_id: AtomicU64::new(0),
			}),
		}
	}

	/// Register a listener. The listener stays active until the returned
	/// [`Subscription`] is dropped.
	pub fn subscribe(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> Subscription<E> {
		let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
		self.inner
			.listeners
			.lock()
			.unwrap()
			.push((id, Arc::new(listener)));

		Subscription {
			registry: Arc::downgrade(&self.inner),
			id,
		}
	}

	/// Deliver an event to every active listener, in subscription order.
	pub fn publish(&self, event: &E) {
		// Listeners run outside the lock so they may subscribe/unsubscribe.
		let listeners: Vec<Listener<E>> = self
			.inner
			.listeners
			.lock()
			.unwrap()
			.iter()
			.map(|(_, l)| Arc::clone(l))
			.collect();

		for listener in listeners {
			listener(event);
		}
	}

	#[cfg(test)]
	fn listener_count(&self) -> usize {
		self.inner.listeners.lock().unwrap().len()
	}
}

/// Guard for a registered listener; unsubscribes on drop.
pub struct Subscription<E> {
	registry: Weak<Registry<E>>,
	id: u64,
}

impl<E> Drop for Subscription<E> {
	fn drop(&mut self) {
		if let Some(registry) = self.registry.upgrade() {
			registry
				.listeners
				.lock()
				.unwrap()
				.retain(|(id, _)| *id != self.id);
			debug!("removed event listener {}", self.id);
		}
	}
}
