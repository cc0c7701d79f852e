//!
//! Wallet provider adapters.
//!
//! Each provider implements the same capability set (availability probe,
//! connect, revalidate, disconnect, sign), selected at runtime by
//! [`ProviderKind`]. Two adapter families exist: browser-extension bridges
//! (HashPack, Blade) that answer immediately, and the pairing bridge
//! (WalletConnect) where connect and sign wait for out-of-band user approval.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::transaction::TransactionRequest;
use crate::wallet::types::{Network, ProviderKind, WalletError, WalletSession};

/// Provider-native identifier for a broadcast transaction.
#[derive(Debug, Clone)]
pub struct SubmissionHandle(pub String);

/// Capability set every wallet provider adapter implements.
#[async_trait]
pub trait WalletProvider: Send + Sync {
	fn kind(&self) -> ProviderKind;

	/// Probe whether the provider can be used at all (extension installed,
	/// bridge reachable). Never errors; unreachable means unavailable.
	async fn is_available(&self) -> bool;

	async fn connect(&self, network: Network) -> Result<WalletSession, WalletError>;

	/// Re-check a persisted session. Access may have been revoked externally
	/// while the application was not running.
	async fn revalidate(&self, session: &WalletSession) -> Result<bool, WalletError>;

	async fn disconnect(&self, session: &WalletSession) -> Result<(), WalletError>;

	async fn sign(
		&self,
		session: &WalletSession,
		request: &TransactionRequest,
	) -> Result<SubmissionHandle, WalletError>;
}

fn bridge_client() -> reqwest::Client {
	reqwest::Client::builder()
		.timeout(Duration::from_secs(10))
		.build()
		.expect("Failed to create HTTP client")
}

async fn probe_health(client: &reqwest::Client, base_url: &str) -> bool {
	let url = format!("{}/health", base_url.trim_end_matches('/'));
	match client
		.get(&url)
		.timeout(Duration::from_secs(2))
		.send()
		.await
	{
		Ok(response) => response.status().is_success(),
		Err(e) => {
			debug!("provider probe failed for {url}: {e}");
			false
		}
	}
}

fn field<'a>(body: &'a Value, name: &str) -> Result<&'a str, WalletError> {
	body.get(name)
		.and_then(Value::as_str)
		.ok_or_else(|| WalletError::Provider(format!("bridge response missing '{name}'")))
}

/// Browser-extension relay adapter. HashPack and Blade speak the same bridge
/// protocol on different endpoints.
pub struct ExtensionBridgeProvider {
	kind: ProviderKind,
	base_url: String,
	client: reqwest::Client,
}

impl ExtensionBridgeProvider {
	pub fn hashpack(base_url: impl Into<String>) -> Self {
		Self::new(ProviderKind::HashPack, base_url)
	}

	pub fn blade(base_url: impl Into<String>) -> Self {
		Self::new(ProviderKind::Blade, base_url)
	}

	fn new(kind: ProviderKind, base_url: impl Into<String>) -> Self {
		Self {
			kind,
			base_url: base_url.into(),
			client: bridge_client(),
		}
	}

	async fn post(&self, path: &str, body: Value) -> Result<(u16, Value), WalletError> {
		let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
		let response = self
			.client
			.post(&url)
			.json(&body)
			.send()
			.await
			.map_err(|e| WalletError::Provider(format!("bridge unreachable: {e}")))?;

		let status = response.status().as_u16();
		let body = response.json::<Value>().await.unwrap_or(Value::Null);
		Ok((status, body))
	}
}

#[async_trait]
impl WalletProvider for ExtensionBridgeProvider {
	fn kind(&self) -> ProviderKind {
		self.kind
	}

	async fn is_available(&self) -> bool {
		probe_health(&self.client, &self.base_url).await
	}

	async fn connect(&self, network: Network) -> Result<WalletSession, WalletError> {
		let (status, body) = self
			.post("/connect", json!({ "network": network }))
			.await?;
		if status != 200 {
			return Err(WalletError::Provider(format!(
				"connect rejected by bridge (HTTP {status})"
			)));
		}

		let session = WalletSession {
			provider: self.kind,
			account: field(&body, "account")?.to_string(),
			network,
			connected_at: Utc::now(),
			signing_token: field(&body, "token")?.to_string(),
		};
		info!(provider = %self.kind, account = %session.account, "wallet connected");
		Ok(session)
	}

	async fn revalidate(&self, session: &WalletSession) -> Result<bool, WalletError> {
		let (status, body) = self
			.post("/session/validate", json!({ "token": session.signing_token }))
			.await?;
		Ok(status == 200 && body.get("valid").and_then(Value::as_bool).unwrap_or(false))
	}

	async fn disconnect(&self, session: &WalletSession) -> Result<(), WalletError> {
		let (status, _) = self
			.post("/disconnect", json!({ "token": session.signing_token }))
			.await?;
		if status != 200 {
			warn!(provider = %self.kind, "bridge returned HTTP {status} on disconnect");
		}
		Ok(())
	}

	async fn sign(
		&self,
		session: &WalletSession,
		request: &TransactionRequest,
	) -> Result<SubmissionHandle, WalletError> {
		let (status, body) = self
			.post(
				"/sign",
				json!({ "token": session.signing_token, "transaction": request }),
			)
			.await?;

		match status {
			200 => Ok(SubmissionHandle(field(&body, "submissionId")?.to_string())),
			403 => Err(WalletError::SigningRejected),
			other => Err(WalletError::Provider(format!(
				"signing failed at bridge (HTTP {other})"
			))),
		}
	}
}

/// QR-pairing adapter (WalletConnect protocol). Connect and sign both create
/// a pending request on the bridge and poll until the user approves it on the
/// paired device.
pub struct PairingProvider {
	base_url: String,
	client: reqwest::Client,
	approval_timeout: Duration,
	poll_interval: Duration,
}

impl PairingProvider {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
			client: bridge_client(),
			approval_timeout: Duration::from_secs(60),
			poll_interval: Duration::from_secs(2),
		}
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url.trim_end_matches('/'), path)
	}

	async fn get_json(&self, path: &str) -> Result<Value, WalletError> {
		self.client
			.get(self.url(path))
			.send()
			.await
			.map_err(|e| WalletError::Provider(format!("bridge unreachable: {e}")))?
			.json::<Value>()
			.await
			.map_err(|e| WalletError::Provider(format!("malformed bridge response: {e}")))
	}

	async fn post_json(&self, path: &str, body: Value) -> Result<Value, WalletError> {
		self.client
			.post(self.url(path))
			.json(&body)
			.send()
			.await
			.map_err(|e| WalletError::Provider(format!("bridge unreachable: {e}")))?
			.json::<Value>()
			.await
			.map_err(|e| WalletError::Provider(format!("malformed bridge response: {e}")))
	}

	/// Poll `path` until its status leaves "pending" or the approval window
	/// closes.
	async fn await_approval(&self, path: &str, what: &str) -> Result<Value, WalletError> {
		let deadline = tokio::time::Instant::now() + self.approval_timeout;
		loop {
			let body = self.get_json(path).await?;
			match body.get("status").and_then(Value::as_str) {
				Some("pending") | None => {}
				Some("approved") => return Ok(body),
				Some("rejected") => {
					return Err(WalletError::SigningRejected);
				}
				Some(other) => {
					return Err(WalletError::Provider(format!(
						"unexpected {what} status '{other}'"
					)));
				}
			}

			if tokio::time::Instant::now() >= deadline {
				return Err(WalletError::Provider(format!("{what} approval timed out")));
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}

#[async_trait]
impl WalletProvider for PairingProvider {
	fn kind(&self) -> ProviderKind {
		ProviderKind::WalletConnect
	}

	async fn is_available(&self) -> bool {
		probe_health(&self.client, &self.base_url).await
	}

	async fn connect(&self, network: Network) -> Result<WalletSession, WalletError> {
		let created = self.post_json("/pairing", json!({ "network": network })).await?;
		let pairing_id = field(&created, "pairingId")?.to_string();
		if let Ok(uri) = field(&created, "uri") {
			info!(%uri, "awaiting pairing approval");
		}

		let approved = match self.await_approval(&format!("/pairing/{pairing_id}"), "pairing").await
		{
			Err(WalletError::SigningRejected) => {
				return Err(WalletError::Provider("pairing rejected by user".to_string()));
			}
			other => other?,
		};

		let session = WalletSession {
			provider: ProviderKind::WalletConnect,
			account: field(&approved, "account")?.to_string(),
			network,
			connected_at: Utc::now(),
			signing_token: field(&approved, "token")?.to_string(),
		};
		info!(account = %session.account, "pairing approved");
		Ok(session)
	}

	async fn revalidate(&self, session: &WalletSession) -> Result<bool, WalletError> {
		let body = self
			.get_json(&format!("/session/{}", session.signing_token))
			.await?;
		Ok(body.get("active").and_then(Value::as_bool).unwrap_or(false))
	}

	async fn disconnect(&self, session: &WalletSession) -> Result<(), WalletError> {
		self.client
			.delete(self.url(&format!("/session/{}", session.signing_token)))
			.send()
			.await
			.map_err(|e| WalletError::Provider(format!("bridge unreachable: {e}")))?;
		Ok(())
	}

	async fn sign(
		&self,
		session: &WalletSession,
		request: &TransactionRequest,
	) -> Result<SubmissionHandle, WalletError> {
		let created = self
			.post_json(
				"/request",
				json!({ "token": session.signing_token, "transaction": request }),
			)
			.await?;
		let request_id = field(&created, "requestId")?.to_string();

		let approved = self
			.await_approval(&format!("/request/{request_id}"), "signing")
			.await?;
		Ok(SubmissionHandle(field(&approved, "submissionId")?.to_string()))
	}
}
