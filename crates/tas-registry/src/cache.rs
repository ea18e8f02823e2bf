//! Pull-through cache of DID documents.
//!
//! Entries live for the TTL (one hour by default). A stale or missing entry
//! is fetched from the registry on access; a failed fetch is an error even
//! if an old copy is still held. An optional background task re-fetches
//! every cached DID once per interval.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use tas_core::{Did, DidDocument};

use crate::error::Result;
use crate::traits::Registry;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Shortest period the background refresh runs at.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    /// Period of the background refresh; defaults to the TTL.
    pub refresh_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL.as_secs(),
            refresh_interval_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[derive(Clone)]
struct CacheEntry {
    document: Arc<DidDocument>,
    fetched_at: Instant,
}

/// Latest-version DID documents keyed by DID.
pub struct DidDocumentCache {
    registry: Arc<dyn Registry>,
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl DidDocumentCache {
    pub fn new(registry: Arc<dyn Registry>, ttl: Duration) -> Self {
        Self {
            registry,
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached document, fetching it when absent or expired.
    pub async fn get(&self, did: &Did) -> Result<Arc<DidDocument>> {
        if let Some(entry) = self.entries.get(did.as_str()) {
            if entry.fetched_at.elapsed() <= self.ttl {
                return Ok(Arc::clone(&entry.document));
            }
        }
        self.fetch(did).await
    }

    /// Drop one entry.
    pub fn invalidate(&self, did: &Did) {
        if self.entries.remove(did.as_str()).is_some() {
            debug!(%did, "DID document evicted");
        }
    }

    /// Re-fetch every cached DID. Returns how many were refreshed.
    ///
    /// A failed refresh keeps the old entry with its old timestamp, so the
    /// next `get` after expiry fetches again.
    pub async fn refresh_all(&self) -> usize {
        let dids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        let mut refreshed = 0;

        for did in dids {
            let parsed = match Did::parse(&did) {
                Ok(d) => d,
                Err(e) => {
                    warn!(%did, error = %e, "dropping unparsable cache key");
                    self.entries.remove(&did);
                    continue;
                }
            };
            match self.fetch(&parsed).await {
                Ok(_) => refreshed += 1,
                Err(e) => warn!(%did, error = %e, "DID document refresh failed"),
            }
        }

        debug!(refreshed, total = self.entries.len(), "cache refresh finished");
        refreshed
    }

    async fn fetch(&self, did: &Did) -> Result<Arc<DidDocument>> {
        let document = Arc::new(self.registry.find_did_doc(did, None).await?);
        self.entries.insert(
            did.to_string(),
            CacheEntry {
                document: Arc::clone(&document),
                fetched_at: Instant::now(),
            },
        );
        Ok(document)
    }

    /// Start the background refresh. The first sweep runs one interval from
    /// now. Intervals below [`MIN_REFRESH_INTERVAL`] are raised to it.
    pub fn start(self: &Arc<Self>, interval: Duration) -> CacheRefresher {
        let interval = if interval < MIN_REFRESH_INTERVAL {
            warn!(
                requested_ms = interval.as_millis() as u64,
                "refresh interval too short, using the minimum"
            );
            MIN_REFRESH_INTERVAL
        } else {
            interval
        };
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let cache = Arc::clone(self);

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        cache.refresh_all().await;
                    }
                    // Fires on stop() and when the refresher is dropped
                    _ = &mut shutdown_rx => break,
                }
            }
            debug!("cache refresher exited");
        });

        info!(interval_secs = interval.as_secs(), "cache refresher started");
        CacheRefresher {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

/// Handle on the background refresh task.
pub struct CacheRefresher {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CacheRefresher {
    /// Signal the task and wait for it to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "cache refresher ended abnormally");
            }
        }
        info!("cache refresher stopped");
    }
}
