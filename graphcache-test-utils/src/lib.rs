//! GRAPHCACHE Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Proptest generators for ids and member lists
//! - Fixtures for fresh in-memory managers and unique sequence ids
//! - A fault-injecting pool for server-error paths
//! - Assertions for error classification and connection release

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use proptest::prelude::*;
use tokio::sync::Barrier;

// Re-export core types for convenience
pub use graphcache_core::{
    CacheError, CacheErrorCode, CacheResult, HealthStatus, StoreError, StoreResult,
    IS_MEMBER_PARAMS_MISSING, REQUIRED_PARAMS_MISSING,
};
pub use graphcache_storage::cache::{InMemoryConnection, InMemoryPool, InMemorySortedSetStore};
pub use graphcache_storage::{
    ConnectionPool, PoolStatus, SequenceCacheManager, SequenceKeyBuilder, SortedSetStore,
};

// ============================================================================
// GENERATORS
// ============================================================================

/// Member ids shaped like graph node identifiers.
pub fn arb_member_id() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}"
}

/// Graph ids, including the empty id and ids containing the key separator.
pub fn arb_graph_id() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        "[a-z]{1,8}",
        "[a-z]{1,4}:[a-z]{1,4}",
    ]
}

/// Non-empty sequence ids.
pub fn arb_sequence_id() -> impl Strategy<Value = String> {
    "[a-z0-9_:]{1,16}"
}

/// Ordered lists of distinct member ids.
pub fn arb_distinct_members(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_member_id(), 0..=max_len).prop_map(|members| {
        let mut seen = HashSet::new();
        members
            .into_iter()
            .filter(|m| seen.insert(m.clone()))
            .collect()
    })
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Manager over a fresh in-memory store.
pub fn fresh_manager() -> SequenceCacheManager<InMemoryPool> {
    SequenceCacheManager::new(InMemoryPool::default())
}

/// A `(graph_id, sequence_id)` pair no other test will use.
pub fn unique_sequence() -> (String, String) {
    let id = uuid::Uuid::now_v7();
    (format!("graph_{}", id.simple()), format!("seq_{}", id.simple()))
}

/// Member ids `m1..=mn`.
pub fn member_ids(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("m{}", i)).collect()
}

// ============================================================================
// FAULT INJECTION
// ============================================================================

/// Store commands that [`FlakyPool`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCommand {
    AddMember,
    AddMembers,
    RemoveMember,
    DeleteKey,
    RangeByScore,
    Cardinality,
    Score,
}

#[derive(Debug, Default)]
struct Faults {
    commands: Mutex<HashSet<StoreCommand>>,
    pauses: Mutex<HashMap<StoreCommand, Arc<Barrier>>>,
    fail_acquire: AtomicBool,
}

impl Faults {
    fn check(&self, command: StoreCommand) -> StoreResult<()> {
        let failing = self
            .commands
            .lock()
            .map(|c| c.contains(&command))
            .unwrap_or(false);
        if failing {
            Err(StoreError::connection(format!("injected failure on {:?}", command)))
        } else {
            Ok(())
        }
    }

    /// Hold the caller at the barrier registered for `command`, if any.
    async fn rendezvous(&self, command: StoreCommand) {
        let barrier = self
            .pauses
            .lock()
            .ok()
            .and_then(|pauses| pauses.get(&command).cloned());
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
    }
}

/// In-memory pool whose connections fail on demand.
#[derive(Debug, Clone, Default)]
pub struct FlakyPool {
    inner: InMemoryPool,
    faults: Arc<Faults>,
}

impl FlakyPool {
    pub fn new(inner: InMemoryPool) -> Self {
        Self {
            inner,
            faults: Arc::default(),
        }
    }

    /// Make every later `command` fail with a connection error.
    pub fn fail_on(&self, command: StoreCommand) -> &Self {
        if let Ok(mut commands) = self.faults.commands.lock() {
            commands.insert(command);
        }
        self
    }

    /// After `command` succeeds, hold each caller until `parties` callers
    /// have run it. Lets tests interleave two operations at a known point.
    /// Only [`StoreCommand::Cardinality`] honours pauses so far.
    pub fn pause_after(&self, command: StoreCommand, parties: usize) -> &Self {
        if let Ok(mut pauses) = self.faults.pauses.lock() {
            pauses.insert(command, Arc::new(Barrier::new(parties)));
        }
        self
    }

    /// Make every later acquire fail.
    pub fn fail_acquire(&self) -> &Self {
        self.faults.fail_acquire.store(true, Ordering::SeqCst);
        self
    }

    /// Clear all injected faults and pauses.
    pub fn heal(&self) {
        if let Ok(mut commands) = self.faults.commands.lock() {
            commands.clear();
        }
        if let Ok(mut pauses) = self.faults.pauses.lock() {
            pauses.clear();
        }
        self.faults.fail_acquire.store(false, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryPool {
        &self.inner
    }
}

/// Connection handed out by [`FlakyPool`].
#[derive(Debug)]
pub struct FlakyConnection {
    inner: InMemoryConnection,
    faults: Arc<Faults>,
}

#[async_trait]
impl SortedSetStore for FlakyConnection {
    async fn add_member(&mut self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        self.faults.check(StoreCommand::AddMember)?;
        self.inner.add_member(key, member, score).await
    }

    async fn add_members(&mut self, key: &str, items: &[(f64, String)]) -> StoreResult<()> {
        self.faults.check(StoreCommand::AddMembers)?;
        self.inner.add_members(key, items).await
    }

    async fn remove_member(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        self.faults.check(StoreCommand::RemoveMember)?;
        self.inner.remove_member(key, member).await
    }

    async fn delete_key(&mut self, key: &str) -> StoreResult<bool> {
        self.faults.check(StoreCommand::DeleteKey)?;
        self.inner.delete_key(key).await
    }

    async fn range_by_score(&mut self, key: &str) -> StoreResult<Vec<String>> {
        self.faults.check(StoreCommand::RangeByScore)?;
        self.inner.range_by_score(key).await
    }

    async fn cardinality(&mut self, key: &str) -> StoreResult<u64> {
        self.faults.check(StoreCommand::Cardinality)?;
        let cardinality = self.inner.cardinality(key).await?;
        self.faults.rendezvous(StoreCommand::Cardinality).await;
        Ok(cardinality)
    }

    async fn score(&mut self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        self.faults.check(StoreCommand::Score)?;
        self.inner.score(key, member).await
    }
}

#[async_trait]
impl ConnectionPool for FlakyPool {
    type Connection = FlakyConnection;

    async fn acquire(&self) -> StoreResult<FlakyConnection> {
        if self.faults.fail_acquire.load(Ordering::SeqCst) {
            return Err(StoreError::connection("injected acquire failure"));
        }
        let inner = self.inner.acquire().await?;
        Ok(FlakyConnection {
            inner,
            faults: Arc::clone(&self.faults),
        })
    }

    fn release(&self, conn: FlakyConnection) {
        self.inner.release(conn.inner);
    }

    fn status(&self) -> PoolStatus {
        self.inner.status()
    }
}

/// Manager over a [`FlakyPool`] with no faults set yet.
pub fn flaky_manager() -> SequenceCacheManager<FlakyPool> {
    SequenceCacheManager::new(FlakyPool::default())
}

// ============================================================================
// ASSERTIONS
// ============================================================================

/// Assert `err` is a client error with `code`.
#[track_caller]
pub fn assert_client_error(err: &CacheError, code: CacheErrorCode) {
    match err {
        CacheError::Client { code: actual, .. } => assert_eq!(*actual, code),
        other => panic!("expected client error {code}, got {other:?}"),
    }
}

/// Assert `err` is a server error with `code`, chained iff `code` is a read.
#[track_caller]
pub fn assert_server_error(err: &CacheError, code: CacheErrorCode) {
    match err {
        CacheError::Server {
            code: actual,
            source,
            ..
        } => {
            assert_eq!(*actual, code);
            assert_eq!(
                source.is_some(),
                code.is_read(),
                "read errors chain their cause, write errors do not"
            );
        }
        other => panic!("expected server error {code}, got {other:?}"),
    }
}

/// Assert no connection borrowed from `pool` is still out.
#[track_caller]
pub fn assert_pool_drained(pool: &InMemoryPool) {
    let stats = pool.stats();
    assert_eq!(
        stats.outstanding(),
        0,
        "{} of {} connections never returned",
        stats.outstanding(),
        stats.acquired
    );
    assert_eq!(pool.status().in_use(), 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_distinct_members_are_distinct() {
        let mut runner = TestRunner::default();
        for _ in 0..32 {
            let members = arb_distinct_members(20)
                .new_tree(&mut runner)
                .unwrap()
                .current();
            let unique: HashSet<_> = members.iter().collect();
            assert_eq!(unique.len(), members.len());
        }
    }

    #[test]
    fn test_unique_sequence_differs() {
        assert_ne!(unique_sequence(), unique_sequence());
        assert_eq!(member_ids(3), vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_flaky_pool_fails_selected_command() {
        let pool = FlakyPool::default();
        pool.fail_on(StoreCommand::Cardinality);

        let mut conn = pool.acquire().await.unwrap();
        assert!(conn.cardinality("k").await.is_err());
        assert!(conn.range_by_score("k").await.is_ok());
        pool.release(conn);

        pool.heal();
        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(conn.cardinality("k").await.unwrap(), 0);
        pool.release(conn);
        assert_pool_drained(pool.inner());
    }

    #[tokio::test]
    async fn test_flaky_pool_fails_acquire() {
        let pool = FlakyPool::default();
        pool.fail_acquire();
        assert!(matches!(
            pool.acquire().await,
            Err(StoreError::Connection { .. })
        ));
        assert_eq!(pool.inner().stats().acquired, 0);
    }
}
