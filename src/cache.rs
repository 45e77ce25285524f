//! Knowledge-base cache.
//!
//! Holds loaded knowledge bases in memory with a TTL and a bounded entry
//! count, shielding the store loader from repeat I/O. Injectable loader and
//! clock, so tests substitute fakes instead of touching disk or sleeping.
//!
//! Key properties:
//! - Entries are immutable `Arc<KnowledgeBase>` snapshots, read-shared by
//!   concurrent scorer tasks
//! - Same-source concurrent misses collapse into one load (single-flight)
//! - Distinct sources never block each other
//! - Overflow evicts the oldest-inserted entry (FIFO by insertion order,
//!   not LRU; a refresh counts as a new insertion)
//! - A loader failure with a resident copy serves the stale copy; a cold
//!   miss propagates the failure

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::models::KnowledgeBase;
use crate::store::{KnowledgeLoader, SourceConfig};

// ─── Clock ───────────────────────────────────────────────────────────────────

/// Monotonic time source for entry expiry. Production uses `SystemClock`;
/// cache tests advance a manual clock instead of sleeping through the TTL.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

struct CacheEntry {
    kb: Arc<KnowledgeBase>,
    loaded_at: Instant,
    /// Insertion sequence number; smallest = oldest-inserted = evicted first.
    seq: u64,
}

/// TTL + capacity bounded knowledge cache with single-flight loads.
pub struct KnowledgeCache {
    loader: Arc<dyn KnowledgeLoader>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
    /// Per-source load guards. Locked only while a miss is being filled;
    /// the std mutex around the map itself is never held across an await.
    flights: StdMutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    seq: AtomicU64,
}

impl KnowledgeCache {
    pub fn new(
        loader: Arc<dyn KnowledgeLoader>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        max_entries: usize,
    ) -> Self {
        Self {
            loader,
            clock,
            ttl,
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
            flights: StdMutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Cache with production defaults (30 min TTL, 10 entries, real clock).
    pub fn with_defaults(loader: Arc<dyn KnowledgeLoader>) -> Self {
        Self::new(
            loader,
            Arc::new(SystemClock),
            crate::config::CACHE_TTL,
            crate::config::CACHE_MAX_ENTRIES,
        )
    }

    /// Get the knowledge base for a source, loading it on miss or expiry.
    pub async fn get(&self, source: &SourceConfig) -> Result<Arc<KnowledgeBase>, EngineError> {
        if let Some(kb) = self.fresh(&source.id) {
            tracing::debug!(source = %source.id, "Cache hit");
            return Ok(kb);
        }

        // Single-flight: same-source misses queue on one guard; the entry
        // re-check below lets waiters reuse the winner's load.
        let guard = self.flight_guard(&source.id);
        let _in_flight = guard.lock().await;

        if let Some(kb) = self.fresh(&source.id) {
            tracing::debug!(source = %source.id, "Cache filled by concurrent load");
            return Ok(kb);
        }

        match self.loader.load(source).await {
            Ok(kb) => {
                let kb = Arc::new(kb);
                self.insert(&source.id, Arc::clone(&kb));
                Ok(kb)
            }
            Err(cause) => {
                if let Some(stale) = self.resident(&source.id) {
                    tracing::warn!(
                        source = %source.id,
                        error = %cause,
                        "Reload failed; serving stale knowledge base"
                    );
                    Ok(stale)
                } else {
                    Err(EngineError::DataUnavailable {
                        source_id: source.id.clone(),
                        cause,
                    })
                }
            }
        }
    }

    /// Drop every entry and in-flight guard. Operator/maintenance surface.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
        if let Ok(mut flights) = self.flights.lock() {
            flights.clear();
        }
        tracing::info!("Knowledge cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resident source ids with their load stamps, for diagnostics.
    pub fn snapshot(&self) -> Vec<(String, DateTime<Utc>)> {
        let Ok(entries) = self.entries.read() else {
            return Vec::new();
        };
        let mut out: Vec<(String, DateTime<Utc>)> = entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.kb.loaded_at))
            .collect();
        out.sort();
        out
    }

    // ── Internals ────────────────────────────────────────

    fn fresh(&self, source_id: &str) -> Option<Arc<KnowledgeBase>> {
        // Poisoned lock counts as a miss; the loader path recovers.
        let entries = self.entries.read().ok()?;
        let entry = entries.get(source_id)?;
        let age = self.clock.now().saturating_duration_since(entry.loaded_at);
        if age < self.ttl {
            Some(Arc::clone(&entry.kb))
        } else {
            None
        }
    }

    fn resident(&self, source_id: &str) -> Option<Arc<KnowledgeBase>> {
        let entries = self.entries.read().ok()?;
        entries.get(source_id).map(|entry| Arc::clone(&entry.kb))
    }

    fn insert(&self, source_id: &str, kb: Arc<KnowledgeBase>) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        entries.insert(
            source_id.to_string(),
            CacheEntry {
                kb,
                loaded_at: self.clock.now(),
                seq,
            },
        );

        while entries.len() > self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    tracing::debug!(source = %id, "Evicting oldest-inserted cache entry");
                    entries.remove(&id);
                }
                None => break,
            }
        }
    }

    fn flight_guard(&self, source_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        match self.flights.lock() {
            Ok(mut flights) => Arc::clone(
                flights
                    .entry(source_id.to_string())
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            ),
            // Poisoned guard map: fall back to a one-off guard. Worst case
            // is a duplicate load, never a deadlock.
            Err(_) => Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}
