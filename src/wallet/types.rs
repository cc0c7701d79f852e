use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// External wallet providers the client can pair with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
	HashPack,
	Blade,
	WalletConnect,
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProviderKind::HashPack => write!(f, "hashpack"),
			ProviderKind::Blade => write!(f, "blade"),
			ProviderKind::WalletConnect => write!(f, "walletconnect"),
		}
	}
}

impl FromStr for ProviderKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"hashpack" => Ok(ProviderKind::HashPack),
			"blade" => Ok(ProviderKind::Blade),
			"walletconnect" => Ok(ProviderKind::WalletConnect),
			other => Err(other.to_string()),
		}
	}
}

/// Network selector, read once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	Test,
	Main,
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Network::Test => write!(f, "test"),
			Network::Main => write!(f, "main"),
		}
	}
}

impl FromStr for Network {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"test" => Ok(Network::Test),
			"main" => Ok(Network::Main),
			other => Err(other.to_string()),
		}
	}
}

/// The live, authenticated link between the application and one provider
/// account. At most one exists process-wide; the session manager owns the
/// only mutable copy and hands out clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSession {
	pub provider: ProviderKind,
	pub account: String,
	pub network: Network,
	pub connected_at: DateTime<Utc>,
	/// Provider-native signing token. Opaque everywhere outside the adapter
	/// that issued it.
	pub signing_token: String,
}

/// Connection state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	Disconnected,
	Connecting,
	Connected,
	/// A connect attempt failed. Behaves like `Disconnected` for the next
	/// `connect`, but is distinguishable so the UI can prompt provider
	/// re-selection.
	ConnectionError,
}

/// Notifications published on every phase transition.
#[derive(Debug, Clone)]
pub enum SessionEvent {
	Connecting { provider: ProviderKind },
	Connected { session: WalletSession },
	ConnectionFailed { provider: ProviderKind, reason: String },
	Disconnected { account: Option<String> },
}

#[derive(Debug, Clone, Error)]
pub enum WalletError {
	#[error("provider {0} is not available")]
	ProviderUnavailable(ProviderKind),

	#[error("a connect attempt is already in flight")]
	AlreadyConnecting,

	#[error("already connected via {0}; disconnect first")]
	AlreadyConnected(ProviderKind),

	#[error("no wallet connected")]
	NotConnected,

	#[error("user rejected the signing request")]
	SigningRejected,

	#[error("provider error: {0}")]
	Provider(String),

	#[error("session store error: {0}")]
	Store(String),
}
