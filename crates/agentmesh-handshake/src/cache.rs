//! Verification cache storage
//!
//! Trait-based abstraction over the handshake's per-DID result cache. The
//! default backend is an in-memory map; entries carry the instant they
//! were cached at, and the handshake (which owns the clock) decides
//! whether an entry is still fresh. Stores must support concurrent
//! read/insert without races.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::RwLock;
use tracing::info;

use crate::result::TrustVerificationResult;

/// A cached verification outcome and when it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct CachedVerification {
    pub result: TrustVerificationResult,
    pub cached_at: DateTime<Utc>,
}

/// Storage backend for cached verification results
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait VerificationStore: Send + Sync + Debug {
    /// Get the cached entry for a peer DID
    async fn get(&self, did: &str) -> Option<CachedVerification>;

    /// Insert or replace the cached entry for a peer DID
    async fn put(&self, did: String, entry: CachedVerification);

    /// Remove a cached entry, returning whether one was present
    async fn remove(&self, did: &str) -> bool;

    /// Drop all cached entries
    async fn clear(&self);

    /// Number of cached entries
    async fn entry_count(&self) -> usize;
}

/// In-memory verification store
///
/// Default backend; data is lost when the handshake is dropped, which is
/// the intended lifetime of a verification cache.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CachedVerification>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn get(&self, did: &str) -> Option<CachedVerification> {
        let entries = self.entries.read().unwrap();
        entries.get(did).cloned()
    }

    async fn put(&self, did: String, entry: CachedVerification) {
        let mut entries = self.entries.write().unwrap();
        info!(did = %did, trusted = entry.result.trusted, "Caching verification result");
        entries.insert(did, entry);
    }

    async fn remove(&self, did: &str) -> bool {
        let mut entries = self.entries.write().unwrap();
        let removed = entries.remove(did).is_some();
        if removed {
            info!(did = %did, "Evicted cached verification");
        }
        removed
    }

    async fn clear(&self) {
        let mut entries = self.entries.write().unwrap();
        entries.clear();
    }

    async fn entry_count(&self) -> usize {
        let entries = self.entries.read().unwrap();
        entries.len()
    }
}
