//! Process-local sorted-set store and pool.
//!
//! Mirrors the Redis semantics the sequence cache relies on:
//! - a key disappears when its last member is removed
//! - ranges are ordered by score, ties by member bytes
//! - bulk writes are applied in order, so a repeated member keeps its last score
//!
//! Useful for tests and for embedding the cache without a Redis server.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use graphcache_core::{StoreError, StoreResult};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::pool::{ConnectionPool, PoolStatus};
use super::store::SortedSetStore;

type SortedSet = HashMap<String, f64>;

/// Shared in-memory keyspace of sorted sets.
#[derive(Debug, Clone, Default)]
pub struct InMemorySortedSetStore {
    sets: Arc<RwLock<HashMap<String, SortedSet>>>,
}

impl InMemorySortedSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently holding at least one member.
    pub fn key_count(&self) -> usize {
        self.sets.read().map(|sets| sets.len()).unwrap_or(0)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.sets
            .read()
            .map(|sets| sets.contains_key(key))
            .unwrap_or(false)
    }

    /// Remove every key.
    pub fn clear(&self) {
        if let Ok(mut sets) = self.sets.write() {
            sets.clear();
        }
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, SortedSet>) -> T) -> StoreResult<T> {
        let sets = self
            .sets
            .read()
            .map_err(|_| StoreError::unavailable("in-memory store lock poisoned"))?;
        Ok(f(&sets))
    }

    fn write<T>(&self, f: impl FnOnce(&mut HashMap<String, SortedSet>) -> T) -> StoreResult<T> {
        let mut sets = self
            .sets
            .write()
            .map_err(|_| StoreError::unavailable("in-memory store lock poisoned"))?;
        Ok(f(&mut sets))
    }
}

fn check_score(score: f64) -> StoreResult<()> {
    if score.is_nan() {
        return Err(StoreError::command("value is not a valid float"));
    }
    Ok(())
}

fn by_score_then_member(a: &(&String, &f64), b: &(&String, &f64)) -> CmpOrdering {
    a.1.total_cmp(b.1).then_with(|| a.0.cmp(b.0))
}

/// Connection handle into an [`InMemorySortedSetStore`].
#[derive(Debug)]
pub struct InMemoryConnection {
    store: InMemorySortedSetStore,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl SortedSetStore for InMemoryConnection {
    async fn add_member(&mut self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        check_score(score)?;
        self.store.write(|sets| {
            sets.entry(key.to_string())
                .or_default()
                .insert(member.to_string(), score);
        })
    }

    async fn add_members(&mut self, key: &str, items: &[(f64, String)]) -> StoreResult<()> {
        if items.is_empty() {
            return Err(StoreError::command(
                "wrong number of arguments for 'zadd' command",
            ));
        }
        for (score, _) in items {
            check_score(*score)?;
        }
        self.store.write(|sets| {
            let set = sets.entry(key.to_string()).or_default();
            for (score, member) in items {
                set.insert(member.clone(), *score);
            }
        })
    }

    async fn remove_member(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        self.store.write(|sets| {
            let Some(set) = sets.get_mut(key) else {
                return false;
            };
            let removed = set.remove(member).is_some();
            if set.is_empty() {
                sets.remove(key);
            }
            removed
        })
    }

    async fn delete_key(&mut self, key: &str) -> StoreResult<bool> {
        self.store.write(|sets| sets.remove(key).is_some())
    }

    async fn range_by_score(&mut self, key: &str) -> StoreResult<Vec<String>> {
        self.store.read(|sets| {
            let Some(set) = sets.get(key) else {
                return Vec::new();
            };
            let mut entries: Vec<(&String, &f64)> = set.iter().collect();
            entries.sort_by(by_score_then_member);
            entries.into_iter().map(|(m, _)| m.clone()).collect()
        })
    }

    async fn cardinality(&mut self, key: &str) -> StoreResult<u64> {
        self.store
            .read(|sets| sets.get(key).map(|set| set.len() as u64).unwrap_or(0))
    }

    async fn score(&mut self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        self.store
            .read(|sets| sets.get(key).and_then(|set| set.get(member).copied()))
    }
}

/// Borrow/return counters for an [`InMemoryPool`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InMemoryPoolStats {
    pub acquired: u64,
    pub released: u64,
}

impl InMemoryPoolStats {
    /// Connections handed out and not yet returned.
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Bounded pool of [`InMemoryConnection`]s over one shared store.
#[derive(Debug, Clone)]
pub struct InMemoryPool {
    store: InMemorySortedSetStore,
    max_size: usize,
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicU64>,
    acquired: Arc<AtomicU64>,
    released: Arc<AtomicU64>,
}

impl Default for InMemoryPool {
    fn default() -> Self {
        Self::new(InMemorySortedSetStore::new(), 16)
    }
}

impl InMemoryPool {
    pub fn new(store: InMemorySortedSetStore, max_size: usize) -> Self {
        Self {
            store,
            max_size,
            permits: Arc::new(Semaphore::new(max_size)),
            waiting: Arc::new(AtomicU64::new(0)),
            acquired: Arc::new(AtomicU64::new(0)),
            released: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The keyspace behind this pool.
    pub fn store(&self) -> &InMemorySortedSetStore {
        &self.store
    }

    pub fn stats(&self) -> InMemoryPoolStats {
        InMemoryPoolStats {
            acquired: self.acquired.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
        }
    }

    /// Stop handing out connections. Pending and future acquires fail.
    pub fn close(&self) {
        self.permits.close();
    }
}

/// Counts one caller in `waiting` until dropped, including when the acquire
/// future is cancelled mid-wait.
struct Waiter<'a>(&'a AtomicU64);

impl<'a> Waiter<'a> {
    fn enter(waiting: &'a AtomicU64) -> Self {
        waiting.fetch_add(1, Ordering::SeqCst);
        Self(waiting)
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionPool for InMemoryPool {
    type Connection = InMemoryConnection;

    async fn acquire(&self) -> StoreResult<InMemoryConnection> {
        let waiter = Waiter::enter(&self.waiting);
        let permit = Arc::clone(&self.permits).acquire_owned().await;
        drop(waiter);

        let permit = permit.map_err(|_| StoreError::PoolClosed)?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(InMemoryConnection {
            store: self.store.clone(),
            _permit: permit,
        })
    }

    fn release(&self, conn: InMemoryConnection) {
        self.released.fetch_add(1, Ordering::SeqCst);
        drop(conn);
    }

    fn status(&self) -> PoolStatus {
        let available = self.permits.available_permits();
        PoolStatus {
            max_size: self.max_size,
            size: self.max_size,
            available,
            waiting: self.waiting.load(Ordering::SeqCst) as usize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::cache::pool::PooledConnection;

    #[tokio::test]
    async fn test_range_orders_by_score_then_member() {
        let pool = InMemoryPool::default();
        let mut conn = pool.acquire().await.unwrap();

        conn.add_member("k", "c", 3.0).await.unwrap();
        conn.add_member("k", "b", 2.0).await.unwrap();
        conn.add_member("k", "x", 2.0).await.unwrap();
        conn.add_member("k", "a", 1.0).await.unwrap();

        assert_eq!(conn.range_by_score("k").await.unwrap(), vec!["a", "b", "x", "c"]);
        pool.release(conn);
    }

    #[tokio::test]
    async fn test_bulk_add_last_write_wins() {
        let pool = InMemoryPool::default();
        let mut conn = pool.acquire().await.unwrap();
        let items = vec![
            (1.0, "a".to_string()),
            (2.0, "b".to_string()),
            (3.0, "a".to_string()),
        ];
        conn.add_members("k", &items).await.unwrap();

        assert_eq!(conn.cardinality("k").await.unwrap(), 2);
        assert_eq!(conn.score("k", "a").await.unwrap(), Some(3.0));
        assert_eq!(conn.range_by_score("k").await.unwrap(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_bulk_add_rejects_empty() {
        let pool = InMemoryPool::default();
        let mut conn = pool.acquire().await.unwrap();
        let err = conn.add_members("k", &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::Command { .. }));
    }

    #[tokio::test]
    async fn test_nan_score_rejected() {
        let pool = InMemoryPool::default();
        let mut conn = pool.acquire().await.unwrap();
        assert!(conn.add_member("k", "a", f64::NAN).await.is_err());
        assert!(!pool.store().contains_key("k"));
    }

    #[tokio::test]
    async fn test_removing_last_member_deletes_key() {
        let pool = InMemoryPool::default();
        let mut conn = pool.acquire().await.unwrap();
        conn.add_member("k", "a", 1.0).await.unwrap();
        assert!(pool.store().contains_key("k"));

        assert!(conn.remove_member("k", "a").await.unwrap());
        assert!(!conn.remove_member("k", "a").await.unwrap());
        assert!(!pool.store().contains_key("k"));
        assert_eq!(conn.cardinality("k").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_key_reports_existence() {
        let pool = InMemoryPool::default();
        let mut conn = pool.acquire().await.unwrap();
        conn.add_member("k", "a", 1.0).await.unwrap();
        assert!(conn.delete_key("k").await.unwrap());
        assert!(!conn.delete_key("k").await.unwrap());
        assert!(conn.range_by_score("k").await.unwrap().is_empty());
        assert_eq!(conn.score("k", "a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_guard_releases_on_drop() {
        let pool = InMemoryPool::new(InMemorySortedSetStore::new(), 2);
        {
            let mut guard = PooledConnection::checkout(&pool).await.unwrap();
            guard.add_member("k", "a", 1.0).await.unwrap();
            assert_eq!(pool.status().in_use(), 1);
            assert_eq!(pool.stats().outstanding(), 1);
        }
        assert_eq!(pool.status().in_use(), 0);
        assert_eq!(pool.stats(), InMemoryPoolStats { acquired: 1, released: 1 });
    }

    #[tokio::test]
    async fn test_closed_pool_refuses() {
        let pool = InMemoryPool::default();
        pool.close();
        let err = pool.acquire().await.unwrap_err();
        assert_eq!(err, StoreError::PoolClosed);
        assert_eq!(pool.stats().acquired, 0);
    }

    #[tokio::test]
    async fn test_pools_share_store() {
        let store = InMemorySortedSetStore::new();
        let p1 = InMemoryPool::new(store.clone(), 1);
        let p2 = InMemoryPool::new(store.clone(), 1);

        let mut c1 = p1.acquire().await.unwrap();
        c1.add_member("k", "a", 1.0).await.unwrap();
        let mut c2 = p2.acquire().await.unwrap();
        assert_eq!(c2.score("k", "a").await.unwrap(), Some(1.0));
        assert_eq!(store.key_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_acquire_stops_waiting() {
        let pool = InMemoryPool::new(InMemorySortedSetStore::new(), 1);
        let held = pool.acquire().await.unwrap();

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), pool.acquire()).await;
        assert!(timed_out.is_err());
        assert_eq!(pool.status().waiting, 0);

        pool.release(held);
        assert_eq!(pool.status().available, 1);
        assert_eq!(pool.stats().outstanding(), 0);
    }
}
