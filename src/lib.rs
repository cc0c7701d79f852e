//! Client-side state layer for the TalentChain marketplace dashboard.
//!
//! Everything between the UI and the outside world lives here: the HTTP
//! transport with retry classification, the wallet session state machine and
//! its provider adapters, the transaction orchestrator that tracks writes to
//! finality, and the stale-while-revalidate entity caches the domain facades
//! read through.

/// Environment-driven process configuration
pub mod config;
/// Typed facades over skills, pools, governance and reputation
pub mod domain;
/// In-process pub/sub for state-change notifications
pub mod events;
/// Entity caching and revalidation
pub mod sync;
/// Write orchestration and lifecycle records
pub mod transaction;
/// HTTP execution, retries and error classification
pub mod transport;
/// Session manager, providers and persistence
pub mod wallet;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use events::{EventBus, Subscription};
pub use transaction::{TransactionOrchestrator, TransactionRecord, TransactionRequest, TxState};
pub use transport::{TransportClient, TransportFailure};
pub use wallet::{Network, ProviderKind, SessionPhase, WalletSessionManager};
