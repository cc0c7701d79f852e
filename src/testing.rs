//! Shared test doubles: scripted transport senders, a scriptable wallet
//! provider and an in-memory session store.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::transaction::TransactionRequest;
use crate::transport::{ApiRequest, HttpSend, RawResponse, TransportError};
use crate::wallet::{
	Network, ProviderKind, SessionStore, SubmissionHandle, WalletError, WalletProvider,
	WalletSession,
};

/// Sender that replays a fixed script of outcomes in order, regardless of the
/// request. Panics when the script runs dry, since that is always a test bug.
pub(crate) struct MockHttp {
	script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
	sends: AtomicU32,
}

impl MockHttp {
	pub(crate) fn sequence(script: Vec<Result<RawResponse, TransportError>>) -> Self {
		Self {
			script: Mutex::new(script.into()),
			sends: AtomicU32::new(0),
		}
	}

	pub(crate) fn sends(&self) -> u32 {
		self.sends.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl HttpSend for MockHttp {
	async fn send(
		&self,
		request: &ApiRequest,
		_timeout: Duration,
	) -> Result<RawResponse, TransportError> {
		self.sends.fetch_add(1, Ordering::SeqCst);
		self.script
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| panic!("mock script exhausted for {}", request.path))
	}
}

/// Sender that routes by path prefix. Each route holds a queue of JSON bodies
/// answered as HTTP 200 in order; an unmatched path or an exhausted queue
/// answers HTTP 404, which the transport classifies as non-retryable.
pub(crate) struct RouterHttp {
	routes: Mutex<Vec<(String, VecDeque<serde_json::Value>)>>,
	sends: AtomicU32,
}

impl RouterHttp {
	pub(crate) fn new() -> Self {
		Self {
			routes: Mutex::new(Vec::new()),
			sends: AtomicU32::new(0),
		}
	}

	pub(crate) fn route(&self, prefix: &str, bodies: Vec<serde_json::Value>) {
		let mut routes = self.routes.lock().unwrap();
		if let Some((_, queue)) = routes.iter_mut().find(|(p, _)| p == prefix) {
			queue.extend(bodies);
		} else {
			routes.push((prefix.to_string(), bodies.into()));
		}
	}

	pub(crate) fn sends(&self) -> u32 {
		self.sends.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl HttpSend for RouterHttp {
	async fn send(
		&self,
		request: &ApiRequest,
		_timeout: Duration,
	) -> Result<RawResponse, TransportError> {
		self.sends.fetch_add(1, Ordering::SeqCst);

		let mut routes = self.routes.lock().unwrap();
		// Longest matching prefix wins, so "/pools/p-1" shadows "/pools".
		let matched = routes
			.iter_mut()
			.filter(|(prefix, _)| request.path.starts_with(prefix.as_str()))
			.max_by_key(|(prefix, _)| prefix.len());

		let body = matched.and_then(|(_, queue)| queue.pop_front());
		Ok(match body {
			Some(body) => RawResponse { status: 200, body },
			None => RawResponse {
				status: 404,
				body: json!({ "success": false, "error": "not found" }),
			},
		})
	}
}

/// Invocation counts observable after the provider has been handed to a
/// manager.
#[derive(Default)]
pub(crate) struct ProviderCounters {
	connects: AtomicU32,
	disconnects: AtomicU32,
}

impl ProviderCounters {
	pub(crate) fn connects(&self) -> u32 {
		self.connects.load(Ordering::SeqCst)
	}

	pub(crate) fn disconnects(&self) -> u32 {
		self.disconnects.load(Ordering::SeqCst)
	}
}

/// Scriptable wallet provider. Defaults to an available provider that
/// connects as `0.0.4521` and approves every signing request.
pub(crate) struct MockProvider {
	kind: ProviderKind,
	available: bool,
	valid_on_revalidate: bool,
	reject_signing: bool,
	reject_signing_once: AtomicBool,
	connect_gate: Option<Arc<Notify>>,
	counters: Arc<ProviderCounters>,
}

impl MockProvider {
	pub(crate) fn new(kind: ProviderKind) -> Self {
		Self {
			kind,
			available: true,
			valid_on_revalidate: true,
			reject_signing: false,
			reject_signing_once: AtomicBool::new(false),
			connect_gate: None,
			counters: Arc::new(ProviderCounters::default()),
		}
	}

	pub(crate) fn unavailable(mut self) -> Self {
		self.available = false;
		self
	}

	pub(crate) fn reject_signing(mut self) -> Self {
		self.reject_signing = true;
		self
	}

	pub(crate) fn reject_signing_once(self) -> Self {
		self.reject_signing_once.store(true, Ordering::SeqCst);
		self
	}

	/// Park `connect` until the gate is notified, so tests can observe the
	/// in-between state.
	pub(crate) fn with_connect_gate(mut self, gate: Arc<Notify>) -> Self {
		self.connect_gate = Some(gate);
		self
	}

	pub(crate) fn with_revalidation(mut self, valid: bool) -> Self {
		self.valid_on_revalidate = valid;
		self
	}

	pub(crate) fn counters(&self) -> Arc<ProviderCounters> {
		self.counters.clone()
	}
}

#[async_trait]
impl WalletProvider for MockProvider {
	fn kind(&self) -> ProviderKind {
		self.kind
	}

	async fn is_available(&self) -> bool {
		self.available
	}

	async fn connect(&self, network: Network) -> Result<WalletSession, WalletError> {
		if let Some(gate) = &self.connect_gate {
			gate.notified().await;
		}
		self.counters.connects.fetch_add(1, Ordering::SeqCst);
		Ok(WalletSession {
			provider: self.kind,
			account: "0.0.4521".to_string(),
			network,
			connected_at: Utc::now(),
			signing_token: "tok-test".to_string(),
		})
	}

	async fn revalidate(&self, _session: &WalletSession) -> Result<bool, WalletError> {
		Ok(self.valid_on_revalidate)
	}

	async fn disconnect(&self, _session: &WalletSession) -> Result<(), WalletError> {
		self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn sign(
		&self,
		_session: &WalletSession,
		_request: &TransactionRequest,
	) -> Result<SubmissionHandle, WalletError> {
		if self.reject_signing || self.reject_signing_once.swap(false, Ordering::SeqCst) {
			return Err(WalletError::SigningRejected);
		}
		Ok(SubmissionHandle("sub-1".to_string()))
	}
}

/// [`SessionStore`] backed by a mutex, with the stored value observable.
#[derive(Default)]
pub(crate) struct MemorySessionStore {
	session: Mutex<Option<WalletSession>>,
	fail_clear: bool,
}

impl MemorySessionStore {
	pub(crate) fn stored(&self) -> Option<WalletSession> {
		self.session.lock().unwrap().clone()
	}

	/// Make every `clear` fail, as a full or read-only disk would.
	pub(crate) fn failing_clear(mut self) -> Self {
		self.fail_clear = true;
		self
	}
}

impl SessionStore for MemorySessionStore {
	fn load(&self) -> Result<Option<WalletSession>, WalletError> {
		Ok(self.session.lock().unwrap().clone())
	}

	fn save(&self, session: &WalletSession) -> Result<(), WalletError> {
		*self.session.lock().unwrap() = Some(session.clone());
		Ok(())
	}

	fn clear(&self) -> Result<(), WalletError> {
		if self.fail_clear {
			return Err(WalletError::Store("failed to remove session file".to_string()));
		}
		*self.session.lock().unwrap() = None;
		Ok(())
	}
}

/// A previously persisted session, as [`FileSessionStore`] would restore it.
///
/// [`FileSessionStore`]: crate::wallet::FileSessionStore
pub(crate) fn test_session(kind: ProviderKind) -> WalletSession {
	WalletSession {
		provider: kind,
		account: "0.0.4521".to_string(),
		network: Network::Test,
		connected_at: Utc::now(),
		signing_token: "tok-restored".to_string(),
	}
}
