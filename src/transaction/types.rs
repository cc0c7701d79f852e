use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub type RequestId = String;

/// The intent to mutate on-chain state. Immutable once constructed and
/// consumed exactly once by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
	pub target_resource: String,
	pub operation_name: String,
	/// Parameter order is part of the signed payload.
	pub parameters: Vec<(String, serde_json::Value)>,
	/// Attached amount, e.g. a stake.
	pub value: Option<u64>,
}

impl TransactionRequest {
	pub fn new(target_resource: impl Into<String>, operation_name: impl Into<String>) -> Self {
		Self {
			target_resource: target_resource.into(),
			operation_name: operation_name.into(),
			parameters: Vec::new(),
			value: None,
		}
	}

	pub fn with_param(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
		self.parameters.push((name.into(), value));
		self
	}

	pub fn with_value(mut self, value: u64) -> Self {
		self.value = Some(value);
		self
	}
}

/// Lifecycle states. Transitions only move forward:
/// `Submitted → Pending → {Confirmed | Failed}` (or `Submitted → Failed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxState {
	Submitted,
	Pending,
	Confirmed,
	Failed,
}

impl TxState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, TxState::Confirmed | TxState::Failed)
	}

	fn rank(&self) -> u8 {
		match self {
			TxState::Submitted => 0,
			TxState::Pending => 1,
			TxState::Confirmed | TxState::Failed => 2,
		}
	}
}

/// Why a record ended in `Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TxErrorDetail {
	/// The user declined in the wallet. Never resubmitted automatically.
	SigningRejected,
	/// Signing/broadcast failed before the network accepted the transaction.
	SubmissionError(String),
	/// The network accepted and then rejected the transaction.
	Rejected(String),
	/// Finality polling exhausted its attempts. The transaction may still
	/// land on-chain later.
	ConfirmationTimeout,
}

impl fmt::Display for TxErrorDetail {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TxErrorDetail::SigningRejected => write!(f, "signing rejected by user"),
			TxErrorDetail::SubmissionError(reason) => write!(f, "submission error: {reason}"),
			TxErrorDetail::Rejected(reason) => write!(f, "rejected on-chain: {reason}"),
			TxErrorDetail::ConfirmationTimeout => write!(f, "confirmation timed out"),
		}
	}
}

/// Tracked lifecycle of one submitted [`TransactionRequest`]. Records are
/// never deleted; a retry creates a new record pointing at the old one via
/// `supersedes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
	pub request_id: RequestId,
	pub state: TxState,
	pub submitted_at: DateTime<Utc>,
	pub last_updated_at: DateTime<Utc>,
	pub result_identifier: Option<String>,
	pub error_detail: Option<TxErrorDetail>,
	pub supersedes: Option<RequestId>,
	/// Local flag only: polling stopped at the caller's request. The
	/// broadcast transaction is NOT retracted on-chain.
	pub cancelled: bool,
}

impl TransactionRecord {
	pub(crate) fn new(request_id: RequestId, supersedes: Option<RequestId>) -> Self {
		let now = Utc::now();
		Self {
			request_id,
			state: TxState::Submitted,
			submitted_at: now,
			last_updated_at: now,
			result_identifier: None,
			error_detail: None,
			supersedes,
			cancelled: false,
		}
	}

	/// Move the record forward. Backward or terminal-to-terminal transitions
	/// are ignored, which keeps the observed state sequence monotonic.
	pub(crate) fn advance(&mut self, state: TxState) -> bool {
		if self.state.is_terminal() || state.rank() <= self.state.rank() {
			return false;
		}
		self.state = state;
		self.last_updated_at = Utc::now();
		true
	}
}

/// Finality polling policy.
#[derive(Debug, Clone, Copy)]
pub struct FinalityConfig {
	pub attempts: u32,
	pub interval: Duration,
}

impl Default for FinalityConfig {
	fn default() -> Self {
		Self {
			attempts: 5,
			interval: Duration::from_secs(3),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_record_state_is_monotonic() {
		let mut record = TransactionRecord::new("r-1".to_string(), None);
		assert_eq!(record.state, TxState::Submitted);

		assert!(record.advance(TxState::Pending));
		assert!(!record.advance(TxState::Submitted));
		assert!(record.advance(TxState::Confirmed));
		assert!(!record.advance(TxState::Failed));
		assert_eq!(record.state, TxState::Confirmed);
	}

	#[test]
	fn test_submitted_can_fail_directly() {
		let mut record = TransactionRecord::new("r-2".to_string(), None);
		assert!(record.advance(TxState::Failed));
		assert!(!record.advance(TxState::Pending));
	}

	#[test]
	fn test_request_builder_preserves_parameter_order() {
		let request = TransactionRequest::new("skill-token", "mint")
			.with_param("name", serde_json::json!("rust"))
			.with_param("level", serde_json::json!(3))
			.with_value(10);

		let names: Vec<&str> = request.parameters.iter().map(|(n, _)| n.as_str()).collect();
		assert_eq!(names, vec!["name", "level"]);
		assert_eq!(request.value, Some(10));
	}
}
