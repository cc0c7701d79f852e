//! Governance facade: proposal listings and voting.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::types::Proposal;
use crate::sync::{CacheRead, SyncCache, SyncError};
use crate::transaction::{TransactionOrchestrator, TransactionRecord, TransactionRequest, TxState};
use crate::transport::{ApiEnvelope, ApiRequest, RequestOptions, TransportClient};

const PROPOSALS_TTL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct GovernanceFacade {
	transport: TransportClient,
	orchestrator: Arc<TransactionOrchestrator>,
	proposals: SyncCache<Vec<Proposal>>,
}

impl GovernanceFacade {
	pub fn new(transport: TransportClient, orchestrator: Arc<TransactionOrchestrator>) -> Self {
		Self {
			transport,
			orchestrator,
			proposals: SyncCache::new(),
		}
	}

	pub async fn active_proposals(&self) -> Result<CacheRead<Vec<Proposal>>, SyncError> {
		let transport = self.transport.clone();
		self.proposals
			.get("governance:proposals", PROPOSALS_TTL, move || async move {
				let body = transport
					.send(
						ApiRequest::get("/governance/proposals?state=active"),
						RequestOptions::default(),
					)
					.await?;
				Ok(ApiEnvelope::<Vec<Proposal>>::decode(body)?)
			})
			.await
	}

	pub async fn cast_vote(&self, proposal_id: &str, support: bool) -> TransactionRecord {
		let request = TransactionRequest::new("governance", "vote")
			.with_param("proposalId", json!(proposal_id))
			.with_param("support", json!(support));

		let record = self.orchestrator.submit(request).await;
		if record.state == TxState::Confirmed {
			self.proposals.invalidate("governance:*");
		}
		record
	}

	/// Drive lazy TTL expiry for the proposals cache. Runs until dropped.
	pub async fn run_revalidation(&self, interval: Duration) {
		self.proposals.run_revalidation(interval).await;
	}

	pub async fn create_proposal(&self, title: &str, description: &str) -> TransactionRecord {
		let request = TransactionRequest::new("governance", "propose")
			.with_param("title", json!(title))
			.with_param("description", json!(description));

		let record = self.orchestrator.submit(request).await;
		if record.state == TxState::Confirmed {
			self.proposals.invalidate("governance:*");
		}
		record
	}
}
