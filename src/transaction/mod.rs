//! Transaction submission and lifecycle tracking.
//!
//! On-chain writes flow through the orchestrator exactly once per request;
//! retrying always means a new request and a new record.

/// Lifecycle driver
mod orchestrator;
/// Request/record types and the finality policy
mod types;

pub use orchestrator::TransactionOrchestrator;
pub use types::{
	FinalityConfig, RequestId, TransactionRecord, TransactionRequest, TxErrorDetail, TxState,
};
