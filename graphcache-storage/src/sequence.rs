//! Ordered sequence cache.
//!
//! A sequence is an ordered list of member ids scoped to a graph id, kept in
//! the store as one sorted set. Scores order the members; auto-assigned
//! scores are `1, 2, 3, ...` in insertion order.
//!
//! Every operation follows the same protocol:
//! 1. validate required arguments, failing with a client error before any
//!    store access
//! 2. borrow exactly one connection, released when the operation returns
//! 3. map any store failure to a server error carrying the operation's code
//!
//! The manager holds no sequence state. It is `Send + Sync` whenever its pool
//! and validator are, and is meant to be built once and shared.

use std::time::Instant;

use graphcache_core::{
    CacheError, CacheErrorCode, CacheResult, HealthCheck, ParameterValidator,
    RequiredFieldValidator, IS_MEMBER_PARAMS_MISSING,
};

use crate::cache::{ConnectionPool, PoolStatus, PooledConnection, SequenceKeyBuilder, SortedSetStore};

/// Key probed by [`SequenceCacheManager::health_check`]. Never written.
pub const HEALTH_PROBE_SEQUENCE: &str = "__health_probe__";

const HEALTH_COMPONENT: &str = "sequence-cache";

/// Create/add/remove/drop/query operations over cached sequences.
#[derive(Debug, Clone)]
pub struct SequenceCacheManager<P, V = RequiredFieldValidator> {
    pool: P,
    validator: V,
    keys: SequenceKeyBuilder,
}

impl<P: ConnectionPool> SequenceCacheManager<P, RequiredFieldValidator> {
    /// Manager with the default non-empty validator and `graph` key prefix.
    pub fn new(pool: P) -> Self {
        Self::with_parts(pool, RequiredFieldValidator, SequenceKeyBuilder::default())
    }
}

impl<P: ConnectionPool, V: ParameterValidator> SequenceCacheManager<P, V> {
    pub fn with_parts(pool: P, validator: V, keys: SequenceKeyBuilder) -> Self {
        Self {
            pool,
            validator,
            keys,
        }
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn keys(&self) -> &SequenceKeyBuilder {
        &self.keys
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.pool.status()
    }

    fn require(&self, code: CacheErrorCode, values: &[&str]) -> CacheResult<()> {
        if self.validator.validate_required(values) {
            Ok(())
        } else {
            Err(CacheError::missing_params(code))
        }
    }

    async fn checkout(&self, code: CacheErrorCode) -> CacheResult<PooledConnection<'_, P>> {
        PooledConnection::checkout(&self.pool)
            .await
            .map_err(|e| CacheError::from_store(code, e))
    }

    /// Write `members` with scores `1..=n` in list order.
    ///
    /// Merges into any existing sequence: members not in the list keep their
    /// scores. A repeated member ends up at its last position. An empty list
    /// writes nothing and succeeds; sending it would make Redis reject a ZADD
    /// with no pairs, which used to surface as a server error.
    pub async fn create_sequence<I, S>(
        &self,
        graph_id: &str,
        sequence_id: &str,
        members: I,
    ) -> CacheResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let code = CacheErrorCode::CreateSequence;
        self.require(code, &[sequence_id])?;

        let items: Vec<(f64, String)> = members
            .into_iter()
            .enumerate()
            .map(|(i, member)| ((i + 1) as f64, member.into()))
            .collect();
        let key = self.keys.sequence_key(graph_id, sequence_id);
        if items.is_empty() {
            tracing::debug!(key = %key, "create_sequence with no members, nothing written");
            return Ok(());
        }

        let mut conn = self.checkout(code).await?;
        conn.add_members(&key, &items).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "create_sequence failed");
            CacheError::from_store(code, e)
        })?;

        tracing::debug!(graph_id, sequence_id, count = items.len(), "Sequence created");
        Ok(())
    }

    /// Place `member_id` at `index`, or append it when `index` is `None` or
    /// not positive. Returns the index used.
    ///
    /// Appending reads the cardinality and then writes in a second command.
    /// Two concurrent appends to the same sequence can observe the same
    /// cardinality and receive the same index.
    pub async fn add_sequence_member(
        &self,
        graph_id: &str,
        sequence_id: &str,
        index: Option<i64>,
        member_id: &str,
    ) -> CacheResult<i64> {
        let code = CacheErrorCode::AddMember;
        self.require(code, &[sequence_id, member_id])?;

        let key = self.keys.sequence_key(graph_id, sequence_id);
        let mut conn = self.checkout(code).await?;

        let index = match index {
            Some(i) if i > 0 => i,
            _ => {
                let cardinality = conn.cardinality(&key).await.map_err(|e| {
                    tracing::warn!(key = %key, error = %e, "add_sequence_member cardinality read failed");
                    CacheError::from_store(code, e)
                })?;
                cardinality as i64 + 1
            }
        };

        conn.add_member(&key, member_id, index as f64)
            .await
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "add_sequence_member failed");
                CacheError::from_store(code, e)
            })?;

        tracing::debug!(graph_id, sequence_id, member_id, index, "Sequence member added");
        Ok(index)
    }

    /// Remove `member_id`. Removing an absent member is not an error.
    pub async fn remove_sequence_member(
        &self,
        graph_id: &str,
        sequence_id: &str,
        member_id: &str,
    ) -> CacheResult<()> {
        let code = CacheErrorCode::RemoveMember;
        self.require(code, &[sequence_id, member_id])?;

        let key = self.keys.sequence_key(graph_id, sequence_id);
        let mut conn = self.checkout(code).await?;
        let removed = conn.remove_member(&key, member_id).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "remove_sequence_member failed");
            CacheError::from_store(code, e)
        })?;

        tracing::debug!(graph_id, sequence_id, member_id, removed, "Sequence member removed");
        Ok(())
    }

    /// Delete the whole sequence. Dropping a missing sequence is not an error.
    pub async fn drop_sequence(&self, graph_id: &str, sequence_id: &str) -> CacheResult<()> {
        let code = CacheErrorCode::DropSequence;
        self.require(code, &[sequence_id])?;

        let key = self.keys.sequence_key(graph_id, sequence_id);
        let mut conn = self.checkout(code).await?;
        let existed = conn.delete_key(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "drop_sequence failed");
            CacheError::from_store(code, e)
        })?;

        tracing::debug!(graph_id, sequence_id, existed, "Sequence dropped");
        Ok(())
    }

    /// Members in ascending score order; empty if the sequence is absent.
    pub async fn get_sequence_members(
        &self,
        graph_id: &str,
        sequence_id: &str,
    ) -> CacheResult<Vec<String>> {
        let code = CacheErrorCode::GetMembers;
        self.require(code, &[sequence_id])?;

        let key = self.keys.sequence_key(graph_id, sequence_id);
        let mut conn = self.checkout(code).await?;
        conn.range_by_score(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "get_sequence_members failed");
            CacheError::from_store(code, e)
        })
    }

    /// Number of members; 0 if the sequence is absent.
    pub async fn get_sequence_cardinality(
        &self,
        graph_id: &str,
        sequence_id: &str,
    ) -> CacheResult<u64> {
        let code = CacheErrorCode::GetMembers;
        self.require(code, &[sequence_id])?;

        let key = self.keys.sequence_key(graph_id, sequence_id);
        let mut conn = self.checkout(code).await?;
        conn.cardinality(&key).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "get_sequence_cardinality failed");
            CacheError::from_store(code, e)
        })
    }

    /// True iff `member_id` has a strictly positive score.
    pub async fn is_sequence_member(
        &self,
        graph_id: &str,
        sequence_id: &str,
        member_id: &str,
    ) -> CacheResult<bool> {
        let code = CacheErrorCode::GetMembers;
        if !self.validator.validate_required(&[sequence_id, member_id]) {
            return Err(CacheError::Client {
                code,
                message: IS_MEMBER_PARAMS_MISSING.to_string(),
            });
        }

        let key = self.keys.sequence_key(graph_id, sequence_id);
        let mut conn = self.checkout(code).await?;
        let score = conn.score(&key, member_id).await.map_err(|e| {
            tracing::warn!(key = %key, error = %e, "is_sequence_member failed");
            CacheError::from_store(code, e)
        })?;

        Ok(matches!(score, Some(s) if s > 0.0))
    }

    /// Probe the store with a cardinality read on a reserved key.
    ///
    /// Never fails; store problems are reported in the returned check.
    pub async fn health_check(&self) -> HealthCheck {
        let started = Instant::now();
        let key = self.keys.sequence_key("", HEALTH_PROBE_SEQUENCE);

        let probe = async {
            let mut conn = PooledConnection::checkout(&self.pool).await?;
            conn.cardinality(&key).await
        };

        match probe.await {
            Ok(_) => HealthCheck::answered(HEALTH_COMPONENT, self.pool.status())
                .with_elapsed(started.elapsed()),
            Err(e) => {
                tracing::warn!(error = %e, "Sequence cache health probe failed");
                HealthCheck::failed(HEALTH_COMPONENT, e.to_string()).with_elapsed(started.elapsed())
            }
        }
    }
}
