use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters describing how a [`ClientPool`](crate::ClientPool)
/// has been used.
///
/// Counters only ever increase; read them through
/// [`ClientPool::stats`](crate::ClientPool::stats).
#[derive(Debug, Default)]
pub struct PoolStats {
    hits: AtomicU64,
    id_misses: AtomicU64,
    constructions: AtomicU64,
    construction_failures: AtomicU64,
    disconnects: AtomicU64,
}

impl PoolStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_id_miss(&self) {
        self.id_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_construction(&self) {
        self.constructions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_construction_failure(&self) {
        self.construction_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, registered: usize) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            id_misses: self.id_misses.load(Ordering::Relaxed),
            constructions: self.constructions.load(Ordering::Relaxed),
            construction_failures: self.construction_failures.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            registered,
        }
    }
}

/// Point-in-time copy of [`PoolStats`] plus the registry size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatsSnapshot {
    /// Lookups answered from the registry
    pub hits: u64,
    /// By-id lookups that found nothing
    pub id_misses: u64,
    /// Clients built by the factory and registered
    pub constructions: u64,
    /// Factory calls that returned an error
    pub construction_failures: u64,
    /// Disconnects that removed an entry
    pub disconnects: u64,
    /// Entries currently registered
    pub registered: usize,
}
