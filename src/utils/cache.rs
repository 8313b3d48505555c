use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
    #[error("value at key {0} holds the wrong kind")]
    WrongType(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("corrupt value at key {key}: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("checkpoint regression: stored {current}, attempted {attempted}")]
    CheckpointRegression { current: u64, attempted: u64 },
}

/// Minimal key-value contract the graph store needs: scalars, set-union members with an
/// optional TTL, and multi-get.
///
/// Mirrors what a Redis-like backend offers (`GET`/`SET`, `SADD`+`EXPIRE`/`SMEMBERS`, `MGET`).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Members of the set at `key`, empty when absent.
    async fn members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Unions `members` into the set at `key`. A `ttl` (re)arms the key's expiry.
    async fn add_members(&self, key: &str, members: Vec<String>, ttl: Option<Duration>) -> Result<(), StoreError>;

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }
}

#[derive(Clone, Debug)]
pub struct CacheItem<T> {
    pub data: T,
    pub timestamp: Instant,
    pub ttl: Option<Duration>,
}

impl<T> CacheItem<T> {
    pub fn new(data: T, ttl: Option<Duration>) -> Self {
        Self { data, timestamp: Instant::now(), ttl }
    }

    pub fn is_expired(&self) -> bool {
        self.ttl.is_some_and(|ttl| self.timestamp.elapsed() > ttl)
    }

    fn rearm(&mut self, ttl: Duration) {
        self.timestamp = Instant::now();
        self.ttl = Some(ttl);
    }
}

#[derive(Clone, Debug)]
pub enum StoredValue {
    Scalar(String),
    Members(HashSet<String>),
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 { 0.0 } else { hits as f64 / total as f64 }
    }
}

/// Process-local `KeyValueStore` on a `DashMap`, with lazy TTL eviction.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, CacheItem<StoredValue>>,
    pub stats: CacheStats,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self, key: &str) -> Option<StoredValue> {
        if let Some(item) = self.entries.get(key) {
            if !item.is_expired() {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                return Some(item.data.clone());
            }
        }

        // re-checked under the shard lock so a concurrent re-arm is never dropped
        if self.entries.remove_if(key, |_, item| item.is_expired()).is_some() {
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn cleanup_expired(&self) {
        self.entries.retain(|_, item| {
            let expired = item.is_expired();
            if expired {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
            !expired
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.live(key) {
            Some(StoredValue::Scalar(value)) => Ok(Some(value)),
            Some(StoredValue::Members(_)) => Err(StoreError::WrongType(key.to_string())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        if let Some(item) = self.entries.get(key) {
            if matches!(item.data, StoredValue::Members(_)) && !item.is_expired() {
                return Err(StoreError::WrongType(key.to_string()));
            }
        }
        self.entries.insert(key.to_string(), CacheItem::new(StoredValue::Scalar(value), None));
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self.live(key) {
            Some(StoredValue::Members(members)) => Ok(members.into_iter().collect()),
            Some(StoredValue::Scalar(_)) => Err(StoreError::WrongType(key.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn add_members(&self, key: &str, members: Vec<String>, ttl: Option<Duration>) -> Result<(), StoreError> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CacheItem::new(StoredValue::Members(HashSet::new()), None));

        if entry.is_expired() {
            *entry = CacheItem::new(StoredValue::Members(HashSet::new()), None);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }

        match &mut entry.data {
            StoredValue::Members(existing) => existing.extend(members),
            StoredValue::Scalar(_) => return Err(StoreError::WrongType(key.to_string())),
        }

        if let Some(ttl) = ttl {
            entry.rearm(ttl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scalar_operations() -> eyre::Result<()> {
        let store = InMemoryStore::new();

        assert!(store.get("a").await?.is_none());

        store.set("a", "1".to_string()).await?;
        store.set("a", "2".to_string()).await?;
        assert_eq!(store.get("a").await?, Some("2".to_string()));

        assert!(store.stats.hits.load(Ordering::Relaxed) > 0);
        assert!(store.stats.misses.load(Ordering::Relaxed) > 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_members_are_unioned() -> eyre::Result<()> {
        let store = InMemoryStore::new();

        store.add_members("set", vec!["x".to_string(), "y".to_string()], None).await?;
        store.add_members("set", vec!["y".to_string(), "z".to_string()], None).await?;

        let mut members = store.members("set").await?;
        members.sort();
        assert_eq!(members, vec!["x", "y", "z"]);
        assert!(store.members("missing").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_members_expire() -> eyre::Result<()> {
        let store = InMemoryStore::new();

        store.add_members("paths", vec!["p".to_string()], Some(Duration::from_millis(5))).await?;
        assert_eq!(store.members("paths").await?.len(), 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.members("paths").await?.is_empty());
        assert_eq!(store.stats.evictions.load(Ordering::Relaxed), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_key_evicted_once() -> eyre::Result<()> {
        let store = InMemoryStore::new();
        store.add_members("paths", vec!["p".to_string()], Some(Duration::from_millis(5))).await?;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(store.get("paths").await?, None);
        assert!(store.members("paths").await?.is_empty());
        assert_eq!(store.stats.evictions.load(Ordering::Relaxed), 1);
        assert_eq!(store.stats.misses.load(Ordering::Relaxed), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_rearmed_key_survives_read() -> eyre::Result<()> {
        let store = InMemoryStore::new();
        store.add_members("paths", vec!["old".to_string()], Some(Duration::from_millis(5))).await?;
        tokio::time::sleep(Duration::from_millis(30)).await;

        store.add_members("paths", vec!["new".to_string()], Some(Duration::from_secs(60))).await?;
        assert_eq!(store.members("paths").await?, vec!["new".to_string()]);
        assert_eq!(store.members("paths").await?, vec!["new".to_string()]);
        assert_eq!(store.stats.evictions.load(Ordering::Relaxed), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_type() -> eyre::Result<()> {
        let store = InMemoryStore::new();
        store.set("scalar", "1".to_string()).await?;

        assert!(matches!(store.members("scalar").await, Err(StoreError::WrongType(_))));
        assert!(matches!(store.add_members("scalar", vec![], None).await, Err(StoreError::WrongType(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_get_many_preserves_order() -> eyre::Result<()> {
        let store = InMemoryStore::new();
        store.set("b", "2".to_string()).await?;

        let values = store.get_many(&["a".to_string(), "b".to_string()]).await?;
        assert_eq!(values, vec![None, Some("2".to_string())]);
        Ok(())
    }
}
