//! Cache synchronization: stale-while-revalidate reads, single-flight
//! coalescing and lazy TTL revalidation for domain entity state.

/// Keyed cache entries and the refresh machinery
mod cache;

pub use cache::{CacheRead, CacheState, SyncCache, SyncError};
