use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use thiserror::Error;

/// HTTP verbs the backend boundary uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
	Get,
	Post,
	Put,
	Delete,
}

impl Method {
	pub fn as_str(&self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Delete => "DELETE",
		}
	}

	/// GET/PUT/DELETE may be retried safely; POST may not, unless the caller
	/// overrides it explicitly.
	pub fn idempotent_by_default(&self) -> bool {
		!matches!(self, Method::Post)
	}
}

/// A logical request against the backend, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
	pub method: Method,
	pub path: String,
	pub body: Option<serde_json::Value>,
	pub headers: Vec<(String, String)>,
}

impl ApiRequest {
	fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			body: None,
			headers: Vec::new(),
		}
	}

	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
		let mut request = Self::new(Method::Post, path);
		request.body = Some(body);
		request
	}

	pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
		let mut request = Self::new(Method::Put, path);
		request.body = Some(body);
		request
	}

	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.push((name.into(), value.into()));
		self
	}
}

/// Per-request execution knobs.
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions {
	/// Per-attempt timeout. Must be non-zero.
	pub timeout: Duration,
	/// Additional attempts after the first send.
	pub max_retries: u32,
	/// `None` falls back to [`Method::idempotent_by_default`].
	pub idempotent: Option<bool>,
}

impl Default for RequestOptions {
	fn default() -> Self {
		Self {
			timeout: Duration::from_millis(10_000),
			max_retries: 3,
			idempotent: None,
		}
	}
}

impl RequestOptions {
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;
		self
	}

	pub fn idempotent(mut self, idempotent: bool) -> Self {
		self.idempotent = Some(idempotent);
		self
	}
}

/// Classified request errors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
	#[error("network failure: {0}")]
	Network(String),

	#[error("request timed out after {0:?}")]
	Timeout(Duration),

	#[error("rate limited (HTTP 429)")]
	RateLimited,

	#[error("server error (HTTP {status})")]
	Server { status: u16, body: String },

	#[error("client error (HTTP {status})")]
	Client { status: u16, body: String },

	#[error("authentication required (HTTP {0})")]
	AuthRequired(u16),

	#[error("invalid request: {0}")]
	InvalidRequest(String),
}

impl TransportError {
	/// Transport-level failures, 429 and 5xx may be retried; everything else
	/// indicates a caller problem and is returned immediately.
	pub fn retryable(&self) -> bool {
		matches!(
			self,
			TransportError::Network(_)
				| TransportError::Timeout(_)
				| TransportError::RateLimited
				| TransportError::Server { .. }
		)
	}

	pub(crate) fn from_status(status: u16, body: String) -> Self {
		match status {
			401 | 403 => TransportError::AuthRequired(status),
			429 => TransportError::RateLimited,
			s if s >= 500 => TransportError::Server { status: s, body },
			s => TransportError::Client { status: s, body },
		}
	}
}

/// Terminal outcome of an exhausted or non-retryable request.
#[derive(Debug, Clone, Error)]
#[error("request failed after {attempts} attempt(s) in {elapsed:?}: {error}")]
pub struct TransportFailure {
	pub error: TransportError,
	pub attempts: u32,
	pub elapsed: Duration,
}

/// Backend response envelope: `{ success, data?, error?, timestamp? }`.
///
/// The transport client hands the raw body back untouched; facades decode the
/// envelope with [`ApiEnvelope::decode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
	pub success: bool,
	#[serde(default = "Option::default")]
	pub data: Option<T>,
	#[serde(default)]
	pub error: Option<String>,
	#[serde(default)]
	pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Error)]
pub enum EnvelopeError {
	#[error("backend rejected request: {0}")]
	Rejected(String),

	#[error("response envelope carried no data")]
	MissingData,

	#[error("malformed response envelope: {0}")]
	Malformed(String),
}

impl<T: DeserializeOwned> ApiEnvelope<T> {
	pub fn decode(body: serde_json::Value) -> Result<T, EnvelopeError> {
		let envelope: ApiEnvelope<T> =
			serde_json::from_value(body).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;

		if !envelope.success {
			return Err(EnvelopeError::Rejected(
				envelope.error.unwrap_or_else(|| "unspecified error".to_string()),
			));
		}

		envelope.data.ok_or(EnvelopeError::MissingData)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_idempotency_defaults_by_method() {
		assert!(Method::Get.idempotent_by_default());
		assert!(Method::Put.idempotent_by_default());
		assert!(Method::Delete.idempotent_by_default());
		assert!(!Method::Post.idempotent_by_default());
	}

	#[test]
	fn test_status_classification() {
		assert!(matches!(
			TransportError::from_status(503, String::new()),
			TransportError::Server { status: 503, .. }
		));
		assert!(matches!(
			TransportError::from_status(401, String::new()),
			TransportError::AuthRequired(401)
		));
		assert!(matches!(
			TransportError::from_status(429, String::new()),
			TransportError::RateLimited
		));
		assert!(matches!(
			TransportError::from_status(404, String::new()),
			TransportError::Client { status: 404, .. }
		));
	}

	#[test]
	fn test_retryable_classes() {
		assert!(TransportError::Network("refused".into()).retryable());
		assert!(TransportError::RateLimited.retryable());
		assert!(
			TransportError::Server {
				status: 500,
				body: String::new()
			}
			.retryable()
		);
		assert!(!TransportError::AuthRequired(401).retryable());
		assert!(
			!TransportError::Client {
				status: 400,
				body: String::new()
			}
			.retryable()
		);
	}

	#[test]
	fn test_envelope_decode() {
		let data: Vec<String> =
			ApiEnvelope::decode(json!({ "success": true, "data": ["a", "b"] })).unwrap();
		assert_eq!(data, vec!["a".to_string(), "b".to_string()]);

		let rejected = ApiEnvelope::<Vec<String>>::decode(
			json!({ "success": false, "error": "no such account" }),
		);
		assert!(matches!(rejected, Err(EnvelopeError::Rejected(msg)) if msg == "no such account"));

		let missing = ApiEnvelope::<Vec<String>>::decode(json!({ "success": true }));
		assert!(matches!(missing, Err(EnvelopeError::MissingData)));
	}
}
