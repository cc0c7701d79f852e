//!
//! Skill token facade: cached reads of user skills and orchestrated skill
//! token writes.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::types::{CreateSkillParams, Skill};
use crate::events::Subscription;
use crate::sync::{CacheRead, SyncCache, SyncError};
use crate::transaction::{TransactionOrchestrator, TransactionRecord, TransactionRequest, TxState};
use crate::transport::{ApiEnvelope, ApiRequest, RequestOptions, TransportClient};
use crate::wallet::{SessionEvent, WalletSessionManager};

const SKILLS_TTL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct SkillsFacade {
	transport: TransportClient,
	orchestrator: Arc<TransactionOrchestrator>,
	cache: SyncCache<Vec<Skill>>,
	// Held so the disconnect eviction hook lives as long as the facade.
	_eviction: Arc<Subscription<SessionEvent>>,
}

impl SkillsFacade {
	pub fn new(
		transport: TransportClient,
		orchestrator: Arc<TransactionOrchestrator>,
		sessions: &WalletSessionManager,
	) -> Self {
		let cache = SyncCache::new();
		let eviction = {
			let cache = cache.clone();
			sessions.subscribe(move |event| {
				if let SessionEvent::Disconnected { account } = event {
					match account {
						Some(account) => cache.evict(&format!("skills:{account}")),
						None => cache.evict("skills:*"),
					}
				}
			})
		};

		Self {
			transport,
			orchestrator,
			cache,
			_eviction: Arc::new(eviction),
		}
	}

	/// Skills owned by `account`, cached with a 30s TTL.
	pub async fn user_skills(&self, account: &str) -> Result<CacheRead<Vec<Skill>>, SyncError> {
		let key = format!("skills:{account}");
		let transport = self.transport.clone();
		let owner = account.to_string();

		self.cache
			.get(&key, SKILLS_TTL, move || async move {
				let body = transport
					.send(
						ApiRequest::get(format!("/skills?owner={owner}")),
						RequestOptions::default(),
					)
					.await?;
				Ok(ApiEnvelope::<Vec<Skill>>::decode(body)?)
			})
			.await
	}

	/// Mint a new skill token for the connected account. Returns the terminal
	/// record; a confirmed mint invalidates the owner's cached skills.
	pub async fn create_skill_token(&self, params: CreateSkillParams) -> TransactionRecord {
		let mut request = TransactionRequest::new("skill-token", "mint")
			.with_param("name", json!(params.name))
			.with_param("category", json!(params.category))
			.with_param("level", json!(params.level));
		if let Some(evidence_uri) = &params.evidence_uri {
			request = request.with_param("evidenceUri", json!(evidence_uri));
		}

		let record = self.orchestrator.submit(request).await;
		if record.state == TxState::Confirmed {
			self.cache.invalidate("skills:*");
		}
		record
	}

	/// Drive lazy TTL expiry for the skills cache. Runs until dropped.
	pub async fn run_revalidation(&self, interval: Duration) {
		self.cache.run_revalidation(interval).await;
	}

	/// Endorse an existing skill token.
	pub async fn endorse_skill(&self, token_id: &str) -> TransactionRecord {
		let request = TransactionRequest::new("skill-token", "endorse")
			.with_param("tokenId", json!(token_id));

		let record = self.orchestrator.submit(request).await;
		if record.state == TxState::Confirmed {
			self.cache.invalidate("skills:*");
		}
		record
	}
}
