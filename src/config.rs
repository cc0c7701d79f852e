//! Process configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::transaction::FinalityConfig;
use crate::wallet::Network;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("environment variable {0} is not set")]
	Missing(&'static str),

	#[error("invalid value '{value}' for {name}: {reason}")]
	Invalid {
		name: &'static str,
		value: String,
		reason: String,
	},
}

/// Everything the binary needs to wire the client together.
#[derive(Debug, Clone)]
pub struct Config {
	/// Base URL of the marketplace backend API.
	pub api_url: String,
	pub network: Network,
	pub hashpack_bridge_url: String,
	pub blade_bridge_url: String,
	pub walletconnect_bridge_url: String,
	/// Where the active session is persisted across restarts.
	pub session_file: PathBuf,
	pub finality: FinalityConfig,
	/// How often cached entries are checked for TTL expiry.
	pub revalidation_interval: Duration,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
	std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &'static str, default: &str) -> String {
	std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	let value = optional(name, default);
	value.parse().map_err(|e: T::Err| ConfigError::Invalid {
		name,
		value,
		reason: e.to_string(),
	})
}

impl Config {
	/// Read configuration from `TALENTCHAIN_*` environment variables. Only
	/// the API URL is required; everything else has a sensible default.
	pub fn from_env() -> Result<Self, ConfigError> {
		let network = optional("TALENTCHAIN_NETWORK", "test");
		let network = network.parse().map_err(|_| ConfigError::Invalid {
			name: "TALENTCHAIN_NETWORK",
			value: network,
			reason: "expected 'test' or 'main'".to_string(),
		})?;

		Ok(Self {
			api_url: required("TALENTCHAIN_API_URL")?,
			network,
			hashpack_bridge_url: optional(
				"TALENTCHAIN_HASHPACK_BRIDGE_URL",
				"http://localhost:7546",
			),
			blade_bridge_url: optional("TALENTCHAIN_BLADE_BRIDGE_URL", "http://localhost:7547"),
			walletconnect_bridge_url: optional(
				"TALENTCHAIN_WALLETCONNECT_BRIDGE_URL",
				"http://localhost:7548",
			),
			session_file: PathBuf::from(optional(
				"TALENTCHAIN_SESSION_FILE",
				".talentchain/session.json",
			)),
			finality: FinalityConfig {
				attempts: parsed("TALENTCHAIN_FINALITY_ATTEMPTS", "5")?,
				interval: Duration::from_secs(parsed("TALENTCHAIN_FINALITY_INTERVAL_SECS", "3")?),
			},
			revalidation_interval: Duration::from_secs(parsed(
				"TALENTCHAIN_REVALIDATION_INTERVAL_SECS",
				"30",
			)?),
		})
	}
}
