//! Sorted-set command surface.
//!
//! The sequence cache is built entirely on these seven commands. Any store
//! with an ordered-set-by-score primitive can back it; Redis maps them to
//! `ZADD`, `ZREM`, `DEL`, `ZRANGE`, `ZCARD` and `ZSCORE`.

use async_trait::async_trait;
use graphcache_core::StoreResult;

/// A single borrowed connection to a sorted-set store.
///
/// Every method is one round trip and atomic at the store. Nothing is atomic
/// across two calls.
#[async_trait]
pub trait SortedSetStore: Send {
    /// Add `member` with `score`, overwriting any previous score.
    async fn add_member(&mut self, key: &str, member: &str, score: f64) -> StoreResult<()>;

    /// Add many `(score, member)` pairs in one command, applied in order.
    async fn add_members(&mut self, key: &str, items: &[(f64, String)]) -> StoreResult<()>;

    /// Remove `member`. Returns whether it was present.
    async fn remove_member(&mut self, key: &str, member: &str) -> StoreResult<bool>;

    /// Delete the whole key. Returns whether it existed.
    async fn delete_key(&mut self, key: &str) -> StoreResult<bool>;

    /// All members ordered by ascending score, ties by member bytes.
    async fn range_by_score(&mut self, key: &str) -> StoreResult<Vec<String>>;

    /// Number of members under `key`; 0 when the key is absent.
    async fn cardinality(&mut self, key: &str) -> StoreResult<u64>;

    /// Score of `member`, if recorded.
    async fn score(&mut self, key: &str, member: &str) -> StoreResult<Option<f64>>;
}
