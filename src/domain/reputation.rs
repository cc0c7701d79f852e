//! Reputation facade. Scores change slowly, so they get a longer TTL than
//! the other entity caches.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::types::ReputationScore;
use crate::events::Subscription;
use crate::sync::{CacheRead, SyncCache, SyncError};
use crate::transport::{ApiEnvelope, ApiRequest, RequestOptions, TransportClient};
use crate::wallet::{SessionEvent, WalletSessionManager};

const REPUTATION_TTL: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct ReputationFacade {
	transport: TransportClient,
	cache: SyncCache<ReputationScore>,
	_eviction: Arc<Subscription<SessionEvent>>,
}

impl ReputationFacade {
	pub fn new(transport: TransportClient, sessions: &WalletSessionManager) -> Self {
		let cache = SyncCache::new();
		let eviction = {
			let cache = cache.clone();
			sessions.subscribe(move |event| {
				if let SessionEvent::Disconnected { account: Some(account) } = event {
					cache.evict(&format!("reputation:{account}"));
				}
			})
		};

		Self {
			transport,
			cache,
			_eviction: Arc::new(eviction),
		}
	}

	pub async fn reputation(&self, account: &str) -> Result<CacheRead<ReputationScore>, SyncError> {
		let key = format!("reputation:{account}");
		let transport = self.transport.clone();
		let account = account.to_string();

		self.cache
			.get(&key, REPUTATION_TTL, move || async move {
				let body = transport
					.send(
						ApiRequest::get(format!("/reputation/{account}")),
						RequestOptions::default(),
					)
					.await?;
				Ok(ApiEnvelope::<ReputationScore>::decode(body)?)
			})
			.await
	}

	/// Drive lazy TTL expiry for the reputation cache. Runs until dropped.
	pub async fn run_revalidation(&self, interval: Duration) {
		self.cache.run_revalidation(interval).await;
	}
}
