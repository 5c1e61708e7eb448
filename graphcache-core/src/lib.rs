//! GRAPHCACHE Core - Shared Types
//!
//! Error taxonomy, store configuration, the parameter validation gate and
//! health/telemetry plumbing. The storage crate builds on these; this crate
//! has no store logic of its own.

pub mod config;
pub mod error;
pub mod health;
pub mod telemetry;
pub mod validation;

pub use config::StoreConfig;
pub use error::{
    CacheError, CacheErrorCode, CacheResult, ConfigError, StoreError, StoreResult,
    IS_MEMBER_PARAMS_MISSING, REQUIRED_PARAMS_MISSING,
};
pub use health::{HealthCheck, HealthStatus, PoolStatus};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
pub use validation::{ParameterValidator, RequiredFieldValidator};
