//! Wallet session management and provider adapters.
//!
//! Exactly one wallet session exists at a time; the
//! [`WalletSessionManager`] owns it and is the only writer. Providers are
//! capability-set adapters selected by [`ProviderKind`] at runtime.

/// Provider trait and the bridge adapters
pub mod provider;
/// Session state machine and its owner
pub mod session;
/// Durable session persistence
pub mod store;
/// Session, phase and error types
pub mod types;

pub use provider::{ExtensionBridgeProvider, PairingProvider, SubmissionHandle, WalletProvider};
pub use session::WalletSessionManager;
pub use store::{FileSessionStore, SessionStore};
pub use types::*;
