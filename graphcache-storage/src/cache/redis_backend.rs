//! Redis-backed sorted-set store using a deadpool connection pool.
//!
//! Connections come from `deadpool-redis`; handing one back is a drop, which
//! returns it to deadpool's idle queue. Command and connect timeouts belong to
//! the pool configuration, not to callers.

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, PoolError, Runtime};
use graphcache_core::{ConfigError, StoreConfig, StoreError, StoreResult};
use redis::{AsyncCommands, RedisError};

use super::pool::{ConnectionPool, PoolStatus};
use super::store::SortedSetStore;

fn map_redis_error(e: RedisError) -> StoreError {
    if e.is_timeout() {
        StoreError::timeout(e.to_string())
    } else if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
        StoreError::connection(e.to_string())
    } else {
        StoreError::command(e.to_string())
    }
}

fn map_pool_error(e: PoolError) -> StoreError {
    match e {
        PoolError::Timeout(kind) => StoreError::PoolExhausted {
            reason: format!("timed out waiting for connection ({:?})", kind),
        },
        PoolError::Closed => StoreError::PoolClosed,
        PoolError::Backend(err) => map_redis_error(err),
        other => StoreError::unavailable(other.to_string()),
    }
}

#[async_trait]
impl SortedSetStore for Connection {
    async fn add_member(&mut self, key: &str, member: &str, score: f64) -> StoreResult<()> {
        let _: () = self.zadd(key, member, score).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn add_members(&mut self, key: &str, items: &[(f64, String)]) -> StoreResult<()> {
        let _: () = self
            .zadd_multiple(key, items)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn remove_member(&mut self, key: &str, member: &str) -> StoreResult<bool> {
        let removed: i64 = self.zrem(key, member).await.map_err(map_redis_error)?;
        Ok(removed > 0)
    }

    async fn delete_key(&mut self, key: &str) -> StoreResult<bool> {
        let deleted: i64 = self.del(key).await.map_err(map_redis_error)?;
        Ok(deleted > 0)
    }

    async fn range_by_score(&mut self, key: &str) -> StoreResult<Vec<String>> {
        self.zrange(key, 0, -1).await.map_err(map_redis_error)
    }

    async fn cardinality(&mut self, key: &str) -> StoreResult<u64> {
        self.zcard(key).await.map_err(map_redis_error)
    }

    async fn score(&mut self, key: &str, member: &str) -> StoreResult<Option<f64>> {
        self.zscore(key, member).await.map_err(map_redis_error)
    }
}

/// Pool of Redis connections.
#[derive(Clone)]
pub struct RedisConnectionPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConnectionPool")
            .field("status", &self.status())
            .finish()
    }
}

impl RedisConnectionPool {
    /// Wrap an existing deadpool pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool from configuration. No connection is opened yet.
    pub fn from_config(config: &StoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut pool_config = PoolConfig::new(config.pool_max_size);
        pool_config.timeouts.wait = Some(config.wait_timeout());
        pool_config.timeouts.create = Some(config.connect_timeout());
        pool_config.timeouts.recycle = Some(config.connect_timeout());

        let mut cfg = Config::from_url(config.url.clone());
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| ConfigError::InvalidValue {
                field: "url".to_string(),
                value: config.url.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!(
            max_size = config.pool_max_size,
            wait_timeout_ms = config.wait_timeout_ms,
            connect_timeout_ms = config.connect_timeout_ms,
            "Redis connection pool created"
        );
        Ok(Self::new(pool))
    }

    /// The underlying deadpool handle.
    pub fn inner(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionPool for RedisConnectionPool {
    type Connection = Connection;

    async fn acquire(&self) -> StoreResult<Connection> {
        self.pool.get().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to acquire redis connection");
            map_pool_error(e)
        })
    }

    fn release(&self, conn: Connection) {
        // Dropping a deadpool object returns it to the idle queue.
        drop(conn);
    }

    fn status(&self) -> PoolStatus {
        let status = self.pool.status();
        PoolStatus {
            max_size: status.max_size,
            size: status.size,
            available: status.available,
            waiting: status.waiting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_rejects_invalid() {
        let config = StoreConfig::default().with_pool_size(0);
        assert!(matches!(
            RedisConnectionPool::from_config(&config),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = StoreConfig::default().with_url("not a url");
        assert!(RedisConnectionPool::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_from_config_is_lazy() {
        // Nothing listens here; building the pool must still succeed.
        let config = StoreConfig::default().with_url("redis://127.0.0.1:1").with_pool_size(2);
        let pool = RedisConnectionPool::from_config(&config).unwrap();
        let status = pool.status();
        assert_eq!(status.max_size, 2);
        assert_eq!(status.size, 0);
    }

    #[test]
    fn test_pool_closed_maps_to_store_error() {
        assert_eq!(map_pool_error(PoolError::Closed), StoreError::PoolClosed);
    }
}
