//!
//! The wallet session manager: owner of the single active wallet connection.
//!
//! State machine: `Disconnected → Connecting → Connected → Disconnected`,
//! with `ConnectionError` recording a failed attempt. All mutation of the
//! session funnels through this type; every other component sees read-only
//! snapshots and synchronous [`SessionEvent`] notifications.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::events::{EventBus, Subscription};
use crate::transaction::TransactionRequest;
use crate::wallet::provider::{SubmissionHandle, WalletProvider};
use crate::wallet::store::SessionStore;
use crate::wallet::types::{
	Network, ProviderKind, SessionEvent, SessionPhase, WalletError, WalletSession,
};

enum SessionState {
	Disconnected,
	Connecting,
	Connected(WalletSession),
	ConnectionError,
}

impl SessionState {
	fn phase(&self) -> SessionPhase {
		match self {
			SessionState::Disconnected => SessionPhase::Disconnected,
			SessionState::Connecting => SessionPhase::Connecting,
			SessionState::Connected(_) => SessionPhase::Connected,
			SessionState::ConnectionError => SessionPhase::ConnectionError,
		}
	}
}

pub struct WalletSessionManager {
	providers: HashMap<ProviderKind, Arc<dyn WalletProvider>>,
	store: Arc<dyn SessionStore>,
	network: Network,
	state: Mutex<SessionState>,
	events: EventBus<SessionEvent>,
}

impl WalletSessionManager {
	pub fn new(network: Network, store: Arc<dyn SessionStore>) -> Self {
		Self {
			providers: HashMap::new(),
			store,
			network,
			state: Mutex::new(SessionState::Disconnected),
			events: EventBus::new(),
		}
	}

	/// Registers a provider adapter, replacing any previous adapter of the
	/// same kind.
	pub fn with_provider(mut self, provider: Arc<dyn WalletProvider>) -> Self {
		self.providers.insert(provider.kind(), provider);
		self
	}

	pub fn phase(&self) -> SessionPhase {
		self.state.lock().unwrap().phase()
	}

	/// Read-only snapshot of the active session, if any.
	pub fn session(&self) -> Option<WalletSession> {
		match &*self.state.lock().unwrap() {
			SessionState::Connected(session) => Some(session.clone()),
			_ => None,
		}
	}

	/// Subscribe to phase transitions. Delivery is synchronous; the listener
	/// is removed when the returned guard drops.
	pub fn subscribe(
		&self,
		listener: impl Fn(&SessionEvent) + Send + Sync + 'static,
	) -> Subscription<SessionEvent> {
		self.events.subscribe(listener)
	}

	/// Connect via the given provider.
	///
	/// Legal from `Disconnected` (or after a failed attempt). A concurrent
	/// call while `Connecting` returns `AlreadyConnecting` without side
	/// effects; switching providers requires an explicit disconnect first.
	pub async fn connect(&self, kind: ProviderKind) -> Result<WalletSession, WalletError> {
		let provider = self
			.providers
			.get(&kind)
			.cloned()
			.ok_or(WalletError::ProviderUnavailable(kind))?;

		{
			let mut state = self.state.lock().unwrap();
			match &*state {
				SessionState::Connecting => return Err(WalletError::AlreadyConnecting),
				SessionState::Connected(session) => {
					return Err(WalletError::AlreadyConnected(session.provider));
				}
				SessionState::Disconnected | SessionState::ConnectionError => {
					*state = SessionState::Connecting;
				}
			}
		}
		self.events.publish(&SessionEvent::Connecting { provider: kind });

		match self.try_connect(provider.as_ref(), kind).await {
			Ok(session) => {
				*self.state.lock().unwrap() = SessionState::Connected(session.clone());
				self.events.publish(&SessionEvent::Connected {
					session: session.clone(),
				});
				Ok(session)
			}
			Err(error) => {
				*self.state.lock().unwrap() = SessionState::ConnectionError;
				warn!(provider = %kind, "connect failed: {error}");
				self.events.publish(&SessionEvent::ConnectionFailed {
					provider: kind,
					reason: error.to_string(),
				});
				Err(error)
			}
		}
	}

	async fn try_connect(
		&self,
		provider: &dyn WalletProvider,
		kind: ProviderKind,
	) -> Result<WalletSession, WalletError> {
		if !provider.is_available().await {
			return Err(WalletError::ProviderUnavailable(kind));
		}

		let session = provider.connect(self.network).await?;
		self.store.save(&session)?;
		info!(provider = %kind, account = %session.account, "session established");
		Ok(session)
	}

	/// Tear down the active session.
	///
	/// Idempotent: calling while already `Disconnected` is a no-op success.
	/// Returns `AlreadyConnecting` while a connect attempt is in flight.
	pub async fn disconnect(&self) -> Result<(), WalletError> {
		let session = {
			let mut state = self.state.lock().unwrap();
			match &*state {
				SessionState::Disconnected => return Ok(()),
				SessionState::Connecting => return Err(WalletError::AlreadyConnecting),
				SessionState::ConnectionError => {
					*state = SessionState::Disconnected;
					None
				}
				SessionState::Connected(session) => {
					let session = session.clone();
					*state = SessionState::Disconnected;
					Some(session)
				}
			}
		};

		if let Some(session) = &session {
			if let Some(provider) = self.providers.get(&session.provider) {
				// Teardown failure must not keep the session alive locally.
				if let Err(e) = provider.disconnect(session).await {
					warn!(provider = %session.provider, "provider teardown failed: {e}");
				}
			}
		}

		let account = session.map(|s| s.account);
		info!(?account, "wallet disconnected");
		// Listeners (cache eviction among them) must hear about the teardown
		// even when clearing the persisted session fails below.
		self.events.publish(&SessionEvent::Disconnected { account });

		if let Err(e) = self.store.clear() {
			warn!("failed to clear persisted session: {e}");
			return Err(e);
		}
		Ok(())
	}

	/// Restore a persisted session at process start.
	///
	/// A stale or revoked session is cleared silently and the manager stays
	/// `Disconnected`; the user just sees a normal disconnected state.
	pub async fn restore_session(&self) -> Option<WalletSession> {
		if self.phase() != SessionPhase::Disconnected {
			debug!("restore skipped: a session is live or being established");
			return None;
		}

		let persisted = match self.store.load() {
			Ok(Some(session)) => session,
			Ok(None) => return None,
			Err(e) => {
				warn!("failed to read persisted session: {e}");
				return None;
			}
		};

		let Some(provider) = self.providers.get(&persisted.provider) else {
			debug!(provider = %persisted.provider, "persisted session for unregistered provider");
			let _ = self.store.clear();
			return None;
		};

		match provider.revalidate(&persisted).await {
			Ok(true) => {
				{
					let mut state = self.state.lock().unwrap();
					// A connect that raced the revalidation wins.
					if !matches!(&*state, SessionState::Disconnected) {
						return None;
					}
					*state = SessionState::Connected(persisted.clone());
				}
				info!(account = %persisted.account, "session restored");
				self.events.publish(&SessionEvent::Connected {
					session: persisted.clone(),
				});
				Some(persisted)
			}
			Ok(false) | Err(_) => {
				debug!("persisted session no longer valid; clearing");
				let _ = self.store.clear();
				None
			}
		}
	}

	/// Sign and submit a transaction through the connected provider.
	pub async fn execute_signed(
		&self,
		request: &TransactionRequest,
	) -> Result<SubmissionHandle, WalletError> {
		let session = match &*self.state.lock().unwrap() {
			SessionState::Connected(session) => session.clone(),
			_ => return Err(WalletError::NotConnected),
		};

		let provider = self
			.providers
			.get(&session.provider)
			.ok_or(WalletError::ProviderUnavailable(session.provider))?;
		provider.sign(&session, request).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MemorySessionStore, MockProvider};
	use tokio::sync::Notify;

	fn manager_with(provider: MockProvider) -> Arc<WalletSessionManager> {
		Arc::new(
			WalletSessionManager::new(Network::Test, Arc::new(MemorySessionStore::default()))
				.with_provider(Arc::new(provider)),
		)
	}

	#[tokio::test]
	async fn test_connect_transitions_to_connected() {
		let manager = manager_with(MockProvider::new(ProviderKind::HashPack));

		assert_eq!(manager.phase(), SessionPhase::Disconnected);
		let session = manager.connect(ProviderKind::HashPack).await.unwrap();
		assert_eq!(manager.phase(), SessionPhase::Connected);
		assert_eq!(session.account, manager.session().unwrap().account);
	}

	#[tokio::test]
	async fn test_connect_while_connected_requires_disconnect() {
		let manager = manager_with(MockProvider::new(ProviderKind::HashPack));

		manager.connect(ProviderKind::HashPack).await.unwrap();
		let second = manager.connect(ProviderKind::HashPack).await;
		assert!(matches!(second, Err(WalletError::AlreadyConnected(_))));

		manager.disconnect().await.unwrap();
		manager.connect(ProviderKind::HashPack).await.unwrap();
	}

	#[tokio::test]
	async fn test_concurrent_connect_rejected_without_side_effects() {
		let gate = Arc::new(Notify::new());
		let provider = MockProvider::new(ProviderKind::HashPack).with_connect_gate(gate.clone());
		let connects = provider.counters();
		let manager = manager_with(provider);

		let background = {
			let manager = manager.clone();
			tokio::spawn(async move { manager.connect(ProviderKind::HashPack).await })
		};
		// Let the first connect reach the provider and park on the gate.
		for _ in 0..5 {
			tokio::task::yield_now().await;
		}
		assert_eq!(manager.phase(), SessionPhase::Connecting);

		let second = manager.connect(ProviderKind::HashPack).await;
		assert!(matches!(second, Err(WalletError::AlreadyConnecting)));

		gate.notify_one();
		background.await.unwrap().unwrap();
		assert_eq!(manager.phase(), SessionPhase::Connected);
		assert_eq!(connects.connects(), 1);
	}

	#[tokio::test]
	async fn test_unavailable_provider_fails_connect() {
		let manager = manager_with(MockProvider::new(ProviderKind::Blade).unavailable());

		let result = manager.connect(ProviderKind::Blade).await;
		assert!(matches!(result, Err(WalletError::ProviderUnavailable(_))));
		assert_eq!(manager.phase(), SessionPhase::ConnectionError);

		// A failed attempt does not block the next one.
		let result = manager.connect(ProviderKind::Blade).await;
		assert!(matches!(result, Err(WalletError::ProviderUnavailable(_))));
	}

	#[tokio::test]
	async fn test_unregistered_provider_is_unavailable() {
		let manager = manager_with(MockProvider::new(ProviderKind::HashPack));

		let result = manager.connect(ProviderKind::WalletConnect).await;
		assert!(matches!(
			result,
			Err(WalletError::ProviderUnavailable(ProviderKind::WalletConnect))
		));
		// No attempt was started, so the machine never left Disconnected.
		assert_eq!(manager.phase(), SessionPhase::Disconnected);
	}

	#[tokio::test]
	async fn test_disconnect_is_idempotent() {
		let provider = MockProvider::new(ProviderKind::HashPack);
		let counters = provider.counters();
		let store = Arc::new(MemorySessionStore::default());
		let manager = Arc::new(
			WalletSessionManager::new(Network::Test, store.clone())
				.with_provider(Arc::new(provider)),
		);

		manager.connect(ProviderKind::HashPack).await.unwrap();
		assert!(store.stored().is_some());

		manager.disconnect().await.unwrap();
		manager.disconnect().await.unwrap();

		assert_eq!(manager.phase(), SessionPhase::Disconnected);
		assert!(store.stored().is_none());
		assert_eq!(counters.disconnects(), 1);
	}

	#[tokio::test]
	async fn test_events_track_every_transition() {
		let manager = manager_with(MockProvider::new(ProviderKind::HashPack));
		let phases = Arc::new(Mutex::new(Vec::new()));

		let phases_clone = phases.clone();
		let _subscription = manager.subscribe(move |event| {
			phases_clone.lock().unwrap().push(match event {
				SessionEvent::Connecting { .. } => "connecting",
				SessionEvent::Connected { .. } => "connected",
				SessionEvent::ConnectionFailed { .. } => "failed",
				SessionEvent::Disconnected { .. } => "disconnected",
			});
		});

		manager.connect(ProviderKind::HashPack).await.unwrap();
		manager.disconnect().await.unwrap();

		assert_eq!(
			*phases.lock().unwrap(),
			vec!["connecting", "connected", "disconnected"]
		);
	}

	#[tokio::test]
	async fn test_disconnect_notifies_listeners_despite_store_failure() {
		let store = Arc::new(MemorySessionStore::default().failing_clear());
		let manager = Arc::new(
			WalletSessionManager::new(Network::Test, store)
				.with_provider(Arc::new(MockProvider::new(ProviderKind::HashPack))),
		);

		let disconnected = Arc::new(Mutex::new(0u32));
		let disconnected_clone = disconnected.clone();
		let _subscription = manager.subscribe(move |event| {
			if matches!(event, SessionEvent::Disconnected { .. }) {
				*disconnected_clone.lock().unwrap() += 1;
			}
		});

		manager.connect(ProviderKind::HashPack).await.unwrap();
		let result = manager.disconnect().await;

		// The store error surfaces, but the local teardown completed and
		// listeners (cache eviction among them) heard about it.
		assert!(matches!(result, Err(WalletError::Store(_))));
		assert_eq!(manager.phase(), SessionPhase::Disconnected);
		assert_eq!(*disconnected.lock().unwrap(), 1);
	}

	#[tokio::test]
	async fn test_restore_session_revalidates() {
		let provider = MockProvider::new(ProviderKind::HashPack);
		let store = Arc::new(MemorySessionStore::default());
		store.save(&crate::testing::test_session(ProviderKind::HashPack)).unwrap();

		let manager = Arc::new(
			WalletSessionManager::new(Network::Test, store.clone())
				.with_provider(Arc::new(provider)),
		);

		let restored = manager.restore_session().await;
		assert!(restored.is_some());
		assert_eq!(manager.phase(), SessionPhase::Connected);
	}

	#[tokio::test]
	async fn test_restore_never_overwrites_live_session() {
		let store = Arc::new(MemorySessionStore::default());
		let manager = Arc::new(
			WalletSessionManager::new(Network::Test, store.clone())
				.with_provider(Arc::new(MockProvider::new(ProviderKind::HashPack))),
		);

		manager.connect(ProviderKind::HashPack).await.unwrap();
		let live = manager.session().unwrap();
		// A leftover persisted session must not displace the live one.
		store.save(&crate::testing::test_session(ProviderKind::HashPack)).unwrap();

		assert!(manager.restore_session().await.is_none());
		assert_eq!(manager.phase(), SessionPhase::Connected);
		assert_eq!(
			manager.session().unwrap().signing_token,
			live.signing_token
		);
	}

	#[tokio::test]
	async fn test_restore_clears_revoked_session_silently() {
		let provider = MockProvider::new(ProviderKind::HashPack).with_revalidation(false);
		let store = Arc::new(MemorySessionStore::default());
		store.save(&crate::testing::test_session(ProviderKind::HashPack)).unwrap();

		let manager = Arc::new(
			WalletSessionManager::new(Network::Test, store.clone())
				.with_provider(Arc::new(provider)),
		);

		assert!(manager.restore_session().await.is_none());
		assert_eq!(manager.phase(), SessionPhase::Disconnected);
		assert!(store.stored().is_none());
	}

	#[tokio::test]
	async fn test_execute_signed_requires_connection() {
		let manager = manager_with(MockProvider::new(ProviderKind::HashPack));
		let request = TransactionRequest::new("skill-token", "mint");

		let result = manager.execute_signed(&request).await;
		assert!(matches!(result, Err(WalletError::NotConnected)));
	}
}
