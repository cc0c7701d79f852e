//!
//! Cached entity state with bounded staleness.
//!
//! Each key holds one entry moving between `Fresh`, `Stale` and `Refreshing`.
//! Reads are stale-while-revalidate: a failed refresh serves the last known
//! good value flagged stale instead of erroring out. Concurrent reads of the
//! same key coalesce onto a single in-flight fetch (single-flight); distinct
//! keys refresh independently.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::transport::{EnvelopeError, TransportFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
	Fresh,
	Stale,
	Refreshing,
}

#[derive(Debug, Clone, Error)]
pub enum SyncError {
	#[error("fetch failed: {0}")]
	Fetch(#[from] TransportFailure),

	#[error("backend error: {0}")]
	Backend(String),
}

impl From<EnvelopeError> for SyncError {
	fn from(error: EnvelopeError) -> Self {
		SyncError::Backend(error.to_string())
	}
}

/// Value handed to callers, with the staleness indicator presentation needs.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
	pub value: T,
	pub stale: bool,
	pub fetched_at: DateTime<Utc>,
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, SyncError>>>;

struct Stored<T> {
	value: T,
	fetched_at: DateTime<Utc>,
	fetched_instant: Instant,
}

struct Slot<T: Clone> {
	value: Option<Stored<T>>,
	state: CacheState,
	ttl: Duration,
	inflight: Option<SharedFetch<T>>,
}

impl<T: Clone> Slot<T> {
	fn empty(ttl: Duration) -> Self {
		Self {
			value: None,
			state: CacheState::Stale,
			ttl,
			inflight: None,
		}
	}

	fn fresh_value(&self) -> Option<&Stored<T>> {
		match (&self.state, &self.value) {
			(CacheState::Fresh, Some(stored)) if stored.fetched_instant.elapsed() <= self.ttl => {
				Some(stored)
			}
			_ => None,
		}
	}
}

/// Keyed cache for one entity type. Cheap to clone; clones share the slots.
pub struct SyncCache<T: Clone> {
	slots: Arc<Mutex<HashMap<String, Slot<T>>>>,
}

impl<T: Clone> Clone for SyncCache<T> {
	fn clone(&self) -> Self {
		Self {
			slots: Arc::clone(&self.slots),
		}
	}
}

impl<T: Clone> Default for SyncCache<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Clone> SyncCache<T> {
	pub fn new() -> Self {
		Self {
			slots: Arc::new(Mutex::new(HashMap::new())),
		}
	}
}

impl<T> SyncCache<T>
where
	T: Clone + Send + Sync + 'static,
{
	/// Read `key`, refreshing through `fetcher` when the entry is stale or
	/// absent.
	///
	/// While a refresh is in flight additional callers attach to it instead
	/// of fetching again, and all of them resolve to the same value.
	pub async fn get<F, Fut>(
		&self,
		key: &str,
		ttl: Duration,
		fetcher: F,
	) -> Result<CacheRead<T>, SyncError>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
	{
		let fetch = {
			let mut slots = self.slots.lock().unwrap();
			let slot = slots
				.entry(key.to_string())
				.or_insert_with(|| Slot::empty(ttl));
			slot.ttl = ttl;

			if let Some(inflight) = &slot.inflight {
				trace!(key, "attaching to in-flight fetch");
				inflight.clone()
			} else if let Some(stored) = slot.fresh_value() {
				return Ok(CacheRead {
					value: stored.value.clone(),
					stale: false,
					fetched_at: stored.fetched_at,
				});
			} else {
				// Leader: run the fetch once and record its outcome.
				let slots_ref = Arc::clone(&self.slots);
				let owned_key = key.to_string();
				let future = fetcher();
				let wrapped: SharedFetch<T> = async move {
					let result = future.await;
					let mut slots = slots_ref.lock().unwrap();
					if let Some(slot) = slots.get_mut(&owned_key) {
						slot.inflight = None;
						match &result {
							Ok(value) => {
								slot.value = Some(Stored {
									value: value.clone(),
									fetched_at: Utc::now(),
									fetched_instant: Instant::now(),
								});
								// An invalidation that landed mid-flight
								// wins: the value is stored but stays stale.
								if slot.state == CacheState::Refreshing {
									slot.state = CacheState::Fresh;
								}
							}
							Err(error) => {
								debug!(key = %owned_key, "refresh failed, keeping last value: {error}");
								slot.state = CacheState::Stale;
							}
						}
					}
					result
				}
				.boxed()
				.shared();

				slot.state = CacheState::Refreshing;
				slot.inflight = Some(wrapped.clone());
				wrapped
			}
		};

		match fetch.await {
			Ok(value) => {
				// The completion bookkeeping ran before this point; read the
				// stored entry so an invalidation (or eviction) that landed
				// mid-flight is reflected in the staleness flag.
				let slots = self.slots.lock().unwrap();
				let (stale, fetched_at) = match slots.get(key) {
					Some(slot) => (
						slot.state != CacheState::Fresh,
						slot.value
							.as_ref()
							.map(|stored| stored.fetched_at)
							.unwrap_or_else(Utc::now),
					),
					None => (true, Utc::now()),
				};
				Ok(CacheRead {
					value,
					stale,
					fetched_at,
				})
			}
			Err(error) => {
				// Serve last-known-good data flagged stale, if there is any.
				let slots = self.slots.lock().unwrap();
				match slots.get(key).and_then(|slot| slot.value.as_ref()) {
					Some(stored) => Ok(CacheRead {
						value: stored.value.clone(),
						stale: true,
						fetched_at: stored.fetched_at,
					}),
					None => Err(error),
				}
			}
		}
	}

	/// Mark matching entries stale without fetching. `pattern` is an exact
	/// key or a `prefix*`.
	pub fn invalidate(&self, pattern: &str) {
		let mut slots = self.slots.lock().unwrap();
		let mut demoted = 0usize;
		for (key, slot) in slots.iter_mut() {
			if pattern_matches(pattern, key) && slot.state != CacheState::Stale {
				slot.state = CacheState::Stale;
				demoted += 1;
			}
		}
		if demoted > 0 {
			debug!(pattern, demoted, "cache entries invalidated");
		}
	}

	/// Remove matching entries outright. Used for user-scoped data on
	/// wallet disconnect.
	pub fn evict(&self, pattern: &str) {
		let mut slots = self.slots.lock().unwrap();
		let before = slots.len();
		slots.retain(|key, _| !pattern_matches(pattern, key));
		let evicted = before - slots.len();
		if evicted > 0 {
			debug!(pattern, evicted, "cache entries evicted");
		}
	}

	/// Demote Fresh entries past their TTL. Lazy: the next `get` refetches;
	/// unobserved keys cost no network traffic.
	pub fn demote_expired(&self) -> usize {
		let mut slots = self.slots.lock().unwrap();
		let mut demoted = 0usize;
		for slot in slots.values_mut() {
			if slot.state == CacheState::Fresh {
				if let Some(stored) = &slot.value {
					if stored.fetched_instant.elapsed() > slot.ttl {
						slot.state = CacheState::Stale;
						demoted += 1;
					}
				}
			}
		}
		demoted
	}

	/// Periodic TTL revalidation loop; run it as a background task.
	pub async fn run_revalidation(&self, interval: Duration) {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		loop {
			ticker.tick().await;
			let demoted = self.demote_expired();
			if demoted > 0 {
				debug!(demoted, "expired cache entries demoted to stale");
			}
		}
	}

	pub fn entry_state(&self, key: &str) -> Option<CacheState> {
		self.slots.lock().unwrap().get(key).map(|slot| slot.state)
	}
}

fn pattern_matches(pattern: &str, key: &str) -> bool {
	match pattern.strip_suffix('*') {
		Some(prefix) => key.starts_with(prefix),
		None => pattern == key,
	}
}
