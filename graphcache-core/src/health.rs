//! Store health as seen through the connection pool.
//!
//! A probe either fails, and the store is unhealthy, or succeeds and the pool
//! snapshot taken right after decides between healthy and degraded.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Configured upper bound on open connections.
    pub max_size: usize,
    /// Connections currently open (idle + borrowed).
    pub size: usize,
    /// Idle connections ready to hand out.
    pub available: usize,
    /// Callers waiting for a connection.
    pub waiting: usize,
}

impl PoolStatus {
    /// Connections currently borrowed.
    pub fn in_use(&self) -> usize {
        self.size.saturating_sub(self.available)
    }

    pub fn is_saturated(&self) -> bool {
        self.waiting > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Probe answered while callers were queued for a connection
    Degraded,
    Unhealthy,
}

/// Outcome of one store probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub component: String,
    pub message: Option<String>,
    pub response_time_ms: Option<u64>,
    /// Pool snapshot, present when the probe reached the store
    pub pool: Option<PoolStatus>,
}

impl HealthCheck {
    /// Probe answered; the pool snapshot decides healthy vs degraded.
    pub fn answered(component: impl Into<String>, pool: PoolStatus) -> Self {
        let (status, message) = if pool.is_saturated() {
            (
                HealthStatus::Degraded,
                Some(format!("{} callers waiting for a connection", pool.waiting)),
            )
        } else {
            (HealthStatus::Healthy, None)
        };
        Self {
            status,
            component: component.into(),
            message,
            response_time_ms: None,
            pool: Some(pool),
        }
    }

    /// Probe failed before or at the store.
    pub fn failed(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            component: component.into(),
            message: Some(reason.into()),
            response_time_ms: None,
            pool: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.response_time_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> PoolStatus {
        PoolStatus {
            max_size: 4,
            size: 2,
            available: 2,
            waiting: 0,
        }
    }

    #[test]
    fn test_in_use_and_saturation() {
        let status = PoolStatus {
            max_size: 8,
            size: 5,
            available: 2,
            waiting: 0,
        };
        assert_eq!(status.in_use(), 3);
        assert!(!status.is_saturated());
        assert_eq!(PoolStatus::default().in_use(), 0);
    }

    #[test]
    fn test_answered_idle_pool_is_healthy() {
        let check = HealthCheck::answered("redis", idle()).with_elapsed(Duration::from_millis(3));
        assert!(check.is_healthy());
        assert_eq!(check.message, None);
        assert_eq!(check.response_time_ms, Some(3));
        assert_eq!(check.pool, Some(idle()));
    }

    #[test]
    fn test_answered_with_waiters_is_degraded() {
        let saturated = PoolStatus {
            available: 0,
            waiting: 3,
            ..idle()
        };
        let check = HealthCheck::answered("redis", saturated);
        assert_eq!(check.status, HealthStatus::Degraded);
        assert_eq!(check.message.as_deref(), Some("3 callers waiting for a connection"));
    }

    #[test]
    fn test_failed_carries_reason_and_no_pool() {
        let check = HealthCheck::failed("redis", "connection refused");
        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert_eq!(check.message.as_deref(), Some("connection refused"));
        assert!(check.pool.is_none());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
