//! In-process store backed by a concurrent map.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use voxroute_core::{ContextStore, StoreError};

struct Entry {
    value: Value,
    touched: Instant,
}

/// A [`ContextStore`] kept in memory for the lifetime of the process.
///
/// Without a TTL, entries live until removed, so a call whose final callback
/// never arrives keeps its binding forever. With [`MemoryStore::with_ttl`],
/// entries neither read nor written within the TTL read as absent and are
/// purged on access or by [`MemoryStore::sweep`].
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    ttl: Option<Duration>,
}

impl MemoryStore {
    /// Create a store that never expires entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose entries expire `ttl` after their last access.
    ///
    /// A call may go without callbacks for a long time: a connected custom
    /// callout stays open for up to four hours before its final callback.
    /// A binding idle for longer than `ttl` is gone by then and the final
    /// callback is discarded, so `ttl` must exceed the longest such gap.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Some(ttl),
        }
    }

    /// Configured expiry, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Number of stored keys, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Purge every expired entry, returning how many were dropped.
    pub fn sweep(&self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.touched) < ttl);
        let purged = before.saturating_sub(self.entries.len());
        #[cfg(feature = "tracing")]
        {
            if purged > 0 {
                tracing::debug!(purged, "expired session entries dropped");
            }
        }
        purged
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.duration_since(entry.touched) >= ttl)
    }
}

#[async_trait]
impl ContextStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let now = Instant::now();
        match self.entries.get_mut(key) {
            None => return Ok(None),
            Some(mut entry) if !self.is_expired(&entry, now) => {
                entry.touched = now;
                return Ok(Some(entry.value.clone()));
            }
            // the shard guard must be released before removing
            Some(_) => {}
        }
        self.entries
            .remove_if(key, |_, entry| self.is_expired(entry, now));
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if value.is_null() {
            self.entries.remove(key);
            return Ok(());
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                touched: Instant::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
