//!
//! Transaction orchestrator: turns a [`TransactionRequest`] into a tracked
//! [`TransactionRecord`] and drives it to a terminal state.
//!
//! Retry is never automatic here. A failed record is terminal; callers that
//! want to try again call [`TransactionOrchestrator::resubmit`], which
//! creates a fresh record referencing the old one. This keeps state-mutating
//! operations from ever being double-submitted.

use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::events::{EventBus, Subscription};
use crate::transaction::types::{
	FinalityConfig, RequestId, TransactionRecord, TransactionRequest, TxErrorDetail, TxState,
};
use crate::transport::{ApiEnvelope, ApiRequest, RequestOptions, TransportClient};
use crate::wallet::{SubmissionHandle, WalletError, WalletSessionManager};

fn new_request_id() -> RequestId {
	let mut bytes = [0u8; 16];
	rand::rng().fill(&mut bytes);
	hex::encode(bytes)
}

/// Receipt shape served by the backend for a broadcast transaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
	status: ReceiptStatus,
	#[serde(default)]
	result_identifier: Option<String>,
	#[serde(default)]
	reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ReceiptStatus {
	Pending,
	Confirmed,
	Rejected,
}

pub struct TransactionOrchestrator {
	sessions: Arc<WalletSessionManager>,
	transport: TransportClient,
	finality: FinalityConfig,
	records: Mutex<HashMap<RequestId, TransactionRecord>>,
	events: EventBus<TransactionRecord>,
}

impl TransactionOrchestrator {
	pub fn new(
		sessions: Arc<WalletSessionManager>,
		transport: TransportClient,
		finality: FinalityConfig,
	) -> Self {
		Self {
			sessions,
			transport,
			finality,
			records: Mutex::new(HashMap::new()),
			events: EventBus::new(),
		}
	}

	/// Subscribe to record snapshots; one is published on every transition.
	pub fn subscribe(
		&self,
		listener: impl Fn(&TransactionRecord) + Send + Sync + 'static,
	) -> Subscription<TransactionRecord> {
		self.events.subscribe(listener)
	}

	pub fn record(&self, request_id: &str) -> Option<TransactionRecord> {
		self.records.lock().unwrap().get(request_id).cloned()
	}

	/// Full submission history, newest last.
	pub fn records(&self) -> Vec<TransactionRecord> {
		let mut records: Vec<TransactionRecord> =
			self.records.lock().unwrap().values().cloned().collect();
		records.sort_by_key(|r| r.submitted_at);
		records
	}

	/// Submit a request and drive it to a terminal state.
	pub async fn submit(&self, request: TransactionRequest) -> TransactionRecord {
		self.submit_superseding(request, None).await
	}

	/// Explicit retry of a prior (typically failed) record. This is the only
	/// retry path; nothing at this layer resubmits on its own, not even for
	/// a rejected signature.
	pub async fn resubmit(
		&self,
		prior: &str,
		request: TransactionRequest,
	) -> TransactionRecord {
		self.submit_superseding(request, Some(prior.to_string())).await
	}

	/// Stop polling a `Submitted`/`Pending` record.
	///
	/// Local only: an already-broadcast transaction is not retracted and may
	/// still confirm on-chain. Returns false for unknown or terminal records.
	pub fn cancel(&self, request_id: &str) -> bool {
		let snapshot = {
			let mut records = self.records.lock().unwrap();
			match records.get_mut(request_id) {
				Some(record) if !record.state.is_terminal() && !record.cancelled => {
					record.cancelled = true;
					Some(record.clone())
				}
				_ => None,
			}
		};

		match snapshot {
			Some(record) => {
				info!(request_id, "transaction polling cancelled locally");
				self.events.publish(&record);
				true
			}
			None => false,
		}
	}

	async fn submit_superseding(
		&self,
		request: TransactionRequest,
		supersedes: Option<RequestId>,
	) -> TransactionRecord {
		let mut record = TransactionRecord::new(new_request_id(), supersedes);
		info!(
			request_id = %record.request_id,
			target = %request.target_resource,
			operation = %request.operation_name,
			"submitting transaction"
		);
		self.store_and_publish(&record);

		let handle = match self.sessions.execute_signed(&request).await {
			Ok(handle) => handle,
			Err(WalletError::SigningRejected) => {
				return self.fail(&mut record, TxErrorDetail::SigningRejected);
			}
			Err(error) => {
				return self.fail(&mut record, TxErrorDetail::SubmissionError(error.to_string()));
			}
		};

		debug!(request_id = %record.request_id, submission = %handle.0, "broadcast accepted by wallet");
		self.poll_finality(&mut record, &handle).await;
		record
	}

	async fn poll_finality(&self, record: &mut TransactionRecord, handle: &SubmissionHandle) {
		// One poller per record; the transport's own retry stays off so the
		// poll schedule is the only source of repeated receipt reads.
		let options = RequestOptions::default()
			.max_retries(0)
			.timeout(self.finality.interval);
		let path = format!("/transactions/{}/receipt", handle.0);

		for attempt in 0..self.finality.attempts {
			tokio::time::sleep(self.finality.interval).await;

			if self.take_cancelled(record) {
				debug!(request_id = %record.request_id, "poll loop stopped by cancellation");
				return;
			}

			let body = match self.transport.send(ApiRequest::get(&path), options).await {
				Ok(body) => body,
				Err(failure) => {
					// Not acknowledged yet (or the backend hiccuped); keep
					// polling until attempts run out.
					debug!(request_id = %record.request_id, attempt, "receipt read failed: {failure}");
					continue;
				}
			};

			let receipt = match ApiEnvelope::<Receipt>::decode(body) {
				Ok(receipt) => receipt,
				Err(e) => {
					warn!(request_id = %record.request_id, "unreadable receipt: {e}");
					continue;
				}
			};

			match receipt.status {
				ReceiptStatus::Pending => {
					if record.state == TxState::Submitted {
						record.advance(TxState::Pending);
						self.store_and_publish(record);
					}
				}
				ReceiptStatus::Confirmed => {
					record.advance(TxState::Pending);
					record.result_identifier = receipt.result_identifier;
					record.advance(TxState::Confirmed);
					info!(
						request_id = %record.request_id,
						result = ?record.result_identifier,
						"transaction confirmed"
					);
					self.store_and_publish(record);
					return;
				}
				ReceiptStatus::Rejected => {
					let reason = receipt.reason.unwrap_or_else(|| "unspecified".to_string());
					record.advance(TxState::Pending);
					self.fail(record, TxErrorDetail::Rejected(reason));
					return;
				}
			}
		}

		warn!(request_id = %record.request_id, "finality polling exhausted");
		self.fail(record, TxErrorDetail::ConfirmationTimeout);
	}

	fn fail(&self, record: &mut TransactionRecord, detail: TxErrorDetail) -> TransactionRecord {
		warn!(request_id = %record.request_id, "transaction failed: {detail}");
		record.error_detail = Some(detail);
		record.advance(TxState::Failed);
		self.store_and_publish(record);
		record.clone()
	}

	/// Merge the cancelled flag set concurrently through `cancel` into the
	/// locally driven record.
	fn take_cancelled(&self, record: &mut TransactionRecord) -> bool {
		let cancelled = self
			.records
			.lock()
			.unwrap()
			.get(&record.request_id)
			.map(|r| r.cancelled)
			.unwrap_or(false);
		if cancelled {
			record.cancelled = true;
		}
		cancelled
	}

	fn store_and_publish(&self, record: &TransactionRecord) {
		{
			let mut records = self.records.lock().unwrap();
			// Keep a cancellation that raced this snapshot.
			let mut snapshot = record.clone();
			if let Some(existing) = records.get(&record.request_id) {
				snapshot.cancelled |= existing.cancelled;
			}
			records.insert(record.request_id.clone(), snapshot);
		}
		self.events.publish(record);
	}
}
