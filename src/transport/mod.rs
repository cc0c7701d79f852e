//! HTTP transport boundary to the marketplace backend.
//!
//! The transport client executes logical requests with a uniform retry
//! policy; the response envelope is decoded by the domain facades, never
//! interpreted here beyond status-code classification.

/// Request executor and retry machinery
mod client;
/// Request/response/error types and the backend envelope
mod types;

pub use client::{HttpSend, RawResponse, ReqwestSend, RetryPolicy, TransportClient};
pub use types::{
	ApiEnvelope, ApiRequest, EnvelopeError, Method, RequestOptions, TransportError,
	TransportFailure,
};
