//!
//! Generic HTTP executor with timeout, retry/backoff and error
//! classification.
//!
//! The client knows nothing about wallets or domain entities; it turns a
//! logical [`ApiRequest`] into at most `1 + max_retries` network sends and
//! returns either the parsed JSON body or a [`TransportFailure`] value.
//! Retries apply only to idempotent requests whose failure is classified
//! retryable, with deterministic exponential backoff.

use async_trait::async_trait;
use backoff::{ExponentialBackoff, future::retry};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::transport::types::{ApiRequest, Method, RequestOptions, TransportError, TransportFailure};

/// Raw HTTP outcome before classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
	pub status: u16,
	pub body: serde_json::Value,
}

/// Low-level send seam. Production uses [`ReqwestSend`]; tests script
/// responses through it.
#[async_trait]
pub trait HttpSend: Send + Sync {
	async fn send(
		&self,
		request: &ApiRequest,
		timeout: Duration,
	) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed sender bound to a base URL.
pub struct ReqwestSend {
	client: reqwest::Client,
	base_url: String,
}

impl ReqwestSend {
	pub fn new(base_url: impl Into<String>) -> Self {
		let client = reqwest::Client::builder()
			.build()
			.expect("Failed to create HTTP client");

		Self {
			client,
			base_url: base_url.into(),
		}
	}

	fn url_for(&self, path: &str) -> String {
		format!(
			"{}/{}",
			self.base_url.trim_end_matches('/'),
			path.trim_start_matches('/')
		)
	}
}

#[async_trait]
impl HttpSend for ReqwestSend {
	async fn send(
		&self,
		request: &ApiRequest,
		timeout: Duration,
	) -> Result<RawResponse, TransportError> {
		let url = self.url_for(&request.path);
		let mut builder = match request.method {
			Method::Get => self.client.get(&url),
			Method::Post => self.client.post(&url),
			Method::Put => self.client.put(&url),
			Method::Delete => self.client.delete(&url),
		};

		builder = builder.timeout(timeout);
		for (name, value) in &request.headers {
			builder = builder.header(name, value);
		}
		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(|e| {
			if e.is_timeout() {
				TransportError::Timeout(timeout)
			} else {
				TransportError::Network(e.to_string())
			}
		})?;

		let status = response.status().as_u16();
		let text = response
			.text()
			.await
			.map_err(|e| TransportError::Network(e.to_string()))?;

		let body = if text.is_empty() {
			serde_json::Value::Null
		} else {
			// Non-JSON bodies (e.g. proxy error pages) are kept as strings so
			// classification can still report them.
			serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
		};

		Ok(RawResponse { status, body })
	}
}

/// Backoff shape shared by every request: `2^attempt * base_delay`, capped.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
	pub base_delay: Duration,
	pub max_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			base_delay: Duration::from_millis(500),
			max_delay: Duration::from_millis(8_000),
		}
	}
}

impl RetryPolicy {
	fn backoff(&self) -> ExponentialBackoff {
		ExponentialBackoff {
			initial_interval: self.base_delay,
			current_interval: self.base_delay,
			randomization_factor: 0.0,
			multiplier: 2.0,
			max_interval: self.max_delay,
			max_elapsed_time: None,
			..ExponentialBackoff::default()
		}
	}
}

/// Shared request executor. Cheap to clone.
#[derive(Clone)]
pub struct TransportClient {
	http: Arc<dyn HttpSend>,
	policy: RetryPolicy,
}

impl TransportClient {
	pub fn new(base_url: &str) -> Self {
		Self::with_http(Arc::new(ReqwestSend::new(base_url)), RetryPolicy::default())
	}

	pub fn with_http(http: Arc<dyn HttpSend>, policy: RetryPolicy) -> Self {
		Self { http, policy }
	}

	/// Execute a request under the retry policy.
	///
	/// Every failure is a value: after exhausting retries the
	/// [`TransportFailure`] carries the last classified error, the attempt
	/// count and the elapsed wall time.
	pub async fn send(
		&self,
		request: ApiRequest,
		options: RequestOptions,
	) -> Result<serde_json::Value, TransportFailure> {
		if options.timeout.is_zero() {
			return Err(TransportFailure {
				error: TransportError::InvalidRequest("timeout must be positive".to_string()),
				attempts: 0,
				elapsed: Duration::ZERO,
			});
		}

		let idempotent = options
			.idempotent
			.unwrap_or_else(|| request.method.idempotent_by_default());
		let started = Instant::now();
		let attempts = AtomicU32::new(0);

		let result = retry(self.policy.backoff(), || async {
			let attempt = attempts.fetch_add(1, Ordering::SeqCst);
			debug!(
				method = request.method.as_str(),
				path = %request.path,
				attempt,
				"sending request"
			);

			let outcome = self.http.send(&request, options.timeout).await;
			let error = match outcome {
				Ok(raw) if (200..300).contains(&raw.status) => return Ok(raw.body),
				Ok(raw) => TransportError::from_status(raw.status, raw.body.to_string()),
				Err(error) => error,
			};

			if error.retryable() && idempotent && attempt < options.max_retries {
				warn!(path = %request.path, attempt, "retryable failure: {error}");
				Err(backoff::Error::transient(error))
			} else {
				Err(backoff::Error::permanent(error))
			}
		})
		.await;

		result.map_err(|error| {
			let failure = TransportFailure {
				error,
				attempts: attempts.load(Ordering::SeqCst),
				elapsed: started.elapsed(),
			};
			warn!(path = %request.path, "{failure}");
			failure
		})
	}
}
