//! GRAPHCACHE Storage - Ordered Sequence Cache
//!
//! Keeps the ordered membership of graph sequences in Redis so callers can
//! read and reorder collection children without going to the graph store.
//! The cache is not the system of record; keeping it in sync with the graph
//! is the caller's job.

pub mod cache;
pub mod sequence;

pub use cache::{
    sequence_key, ConnectionPool, InMemoryPool, InMemorySortedSetStore, PoolStatus,
    PooledConnection, RedisConnectionPool, SequenceKeyBuilder, SortedSetStore,
};
pub use sequence::{SequenceCacheManager, HEALTH_PROBE_SEQUENCE};

use graphcache_core::{ConfigError, StoreConfig};

/// Redis-backed manager built from configuration.
pub type RedisSequenceCache = SequenceCacheManager<RedisConnectionPool>;

/// Build a Redis-backed manager using the configured pool and key prefix.
pub fn redis_sequence_cache(config: &StoreConfig) -> Result<RedisSequenceCache, ConfigError> {
    let pool = RedisConnectionPool::from_config(config)?;
    Ok(SequenceCacheManager::with_parts(
        pool,
        graphcache_core::RequiredFieldValidator,
        SequenceKeyBuilder::new(config.key_prefix.clone()),
    ))
}
