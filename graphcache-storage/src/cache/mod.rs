//! Store plumbing for the sequence cache.
//!
//! - [`key`]: namespaced, collision-free key construction
//! - [`store`]: the sorted-set commands the cache issues
//! - [`pool`]: connection pool seam and the scoped [`PooledConnection`] guard
//! - [`redis_backend`]: Redis via `deadpool-redis`
//! - [`memory_backend`]: process-local store with the same semantics
//!
//! # Example
//!
//! ```ignore
//! let pool = RedisConnectionPool::from_config(&StoreConfig::from_env())?;
//! let mut conn = PooledConnection::checkout(&pool).await?;
//! let members = conn.range_by_score(&sequence_key("g1", "seq1")).await?;
//! // `conn` goes back to the pool here
//! ```

pub mod key;
pub mod memory_backend;
pub mod pool;
pub mod redis_backend;
pub mod store;

pub use key::{sequence_key, SequenceKeyBuilder, SEQUENCE_TAG};
pub use memory_backend::{
    InMemoryConnection, InMemoryPool, InMemoryPoolStats, InMemorySortedSetStore,
};
pub use pool::{ConnectionPool, PoolStatus, PooledConnection};
pub use redis_backend::RedisConnectionPool;
pub use store::SortedSetStore;
