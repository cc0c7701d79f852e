//! Talent pool facade: pool listings/details with cached reads, and staked
//! membership writes.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::types::TalentPool;
use crate::sync::{CacheRead, SyncCache, SyncError};
use crate::transaction::{TransactionOrchestrator, TransactionRecord, TransactionRequest, TxState};
use crate::transport::{ApiEnvelope, ApiRequest, RequestOptions, TransportClient};

const POOLS_TTL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct PoolsFacade {
	transport: TransportClient,
	orchestrator: Arc<TransactionOrchestrator>,
	listing: SyncCache<Vec<TalentPool>>,
	details: SyncCache<TalentPool>,
}

impl PoolsFacade {
	pub fn new(transport: TransportClient, orchestrator: Arc<TransactionOrchestrator>) -> Self {
		Self {
			transport,
			orchestrator,
			listing: SyncCache::new(),
			details: SyncCache::new(),
		}
	}

	pub async fn list_pools(&self) -> Result<CacheRead<Vec<TalentPool>>, SyncError> {
		let transport = self.transport.clone();
		self.listing
			.get("pools:all", POOLS_TTL, move || async move {
				let body = transport
					.send(ApiRequest::get("/pools"), RequestOptions::default())
					.await?;
				Ok(ApiEnvelope::<Vec<TalentPool>>::decode(body)?)
			})
			.await
	}

	pub async fn pool(&self, pool_id: &str) -> Result<CacheRead<TalentPool>, SyncError> {
		let key = format!("pools:{pool_id}");
		let transport = self.transport.clone();
		let pool_id = pool_id.to_string();

		self.details
			.get(&key, POOLS_TTL, move || async move {
				let body = transport
					.send(
						ApiRequest::get(format!("/pools/{pool_id}")),
						RequestOptions::default(),
					)
					.await?;
				Ok(ApiEnvelope::<TalentPool>::decode(body)?)
			})
			.await
	}

	/// Join a pool, staking `stake` through the transaction's value field.
	pub async fn join_pool(&self, pool_id: &str, stake: u64) -> TransactionRecord {
		let request = TransactionRequest::new("talent-pool", "join")
			.with_param("poolId", json!(pool_id))
			.with_value(stake);

		let record = self.orchestrator.submit(request).await;
		if record.state == TxState::Confirmed {
			self.listing.invalidate("pools:*");
			self.details.invalidate(&format!("pools:{pool_id}"));
		}
		record
	}

	/// Drive lazy TTL expiry for both pool caches. Runs until dropped.
	pub async fn run_revalidation(&self, interval: Duration) {
		futures::join!(
			self.listing.run_revalidation(interval),
			self.details.run_revalidation(interval),
		);
	}

	pub async fn leave_pool(&self, pool_id: &str) -> TransactionRecord {
		let request = TransactionRequest::new("talent-pool", "leave")
			.with_param("poolId", json!(pool_id));

		let record = self.orchestrator.submit(request).await;
		if record.state == TxState::Confirmed {
			self.listing.invalidate("pools:*");
			self.details.invalidate(&format!("pools:{pool_id}"));
		}
		record
	}
}
