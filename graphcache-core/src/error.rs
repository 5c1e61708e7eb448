//! Error types for sequence cache operations

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Message attached to every client error raised by the validation gate.
pub const REQUIRED_PARAMS_MISSING: &str = "Required parameters are missing";

/// Message used by the membership check when validation fails.
pub const IS_MEMBER_PARAMS_MISSING: &str = "IsSequenceMember: Required parameters are missing";

/// Stable, machine-readable error codes, one per operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheErrorCode {
    #[serde(rename = "ERR_CACHE_CREATE_SEQ_ERROR")]
    CreateSequence,
    #[serde(rename = "ERR_CACHE_SEQ_ADD_MEMBER_ERROR")]
    AddMember,
    #[serde(rename = "ERR_CACHE_SEQ_REMOVE_MEMBER_ERROR")]
    RemoveMember,
    #[serde(rename = "ERR_CACHE_DROP_SEQ_ERROR")]
    DropSequence,
    /// Shared by members, cardinality and membership reads.
    #[serde(rename = "ERR_CACHE_SEQ_GET_MEMBERS_ERROR")]
    GetMembers,
}

impl CacheErrorCode {
    /// The wire representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheErrorCode::CreateSequence => "ERR_CACHE_CREATE_SEQ_ERROR",
            CacheErrorCode::AddMember => "ERR_CACHE_SEQ_ADD_MEMBER_ERROR",
            CacheErrorCode::RemoveMember => "ERR_CACHE_SEQ_REMOVE_MEMBER_ERROR",
            CacheErrorCode::DropSequence => "ERR_CACHE_DROP_SEQ_ERROR",
            CacheErrorCode::GetMembers => "ERR_CACHE_SEQ_GET_MEMBERS_ERROR",
        }
    }

    /// Whether operations under this code only read from the store.
    pub fn is_read(&self) -> bool {
        matches!(self, CacheErrorCode::GetMembers)
    }
}

impl fmt::Display for CacheErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by the key-value store or its connection pool.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection failed: {reason}")]
    Connection { reason: String },

    #[error("Store operation timed out: {reason}")]
    Timeout { reason: String },

    #[error("Store command failed: {reason}")]
    Command { reason: String },

    #[error("Connection pool exhausted: {reason}")]
    PoolExhausted { reason: String },

    #[error("Connection pool closed")]
    PoolClosed,

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        Self::Timeout {
            reason: reason.into(),
        }
    }

    pub fn command(reason: impl Into<String>) -> Self {
        Self::Command {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Result type alias for raw store commands.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error surfaced to callers of the sequence cache.
///
/// `Client` means the caller passed bad input and nothing reached the store.
/// `Server` means the store (or the pool in front of it) failed. Reads keep
/// the originating [`StoreError`] as `source`; writes only keep its message.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("[{code}] {message}")]
    Client {
        code: CacheErrorCode,
        message: String,
    },

    #[error("[{code}] {message}")]
    Server {
        code: CacheErrorCode,
        message: String,
        #[source]
        source: Option<StoreError>,
    },
}

impl CacheError {
    /// Client error with the standard "required parameters" message.
    pub fn missing_params(code: CacheErrorCode) -> Self {
        Self::Client {
            code,
            message: REQUIRED_PARAMS_MISSING.to_string(),
        }
    }

    /// Server error for a write operation: the store message only.
    pub fn server(code: CacheErrorCode, err: &StoreError) -> Self {
        Self::Server {
            code,
            message: err.to_string(),
            source: None,
        }
    }

    /// Server error for a read operation: the store error stays chained.
    pub fn server_with_cause(code: CacheErrorCode, err: StoreError) -> Self {
        Self::Server {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Wrap a store failure according to the operation's read/write family.
    pub fn from_store(code: CacheErrorCode, err: StoreError) -> Self {
        if code.is_read() {
            Self::server_with_cause(code, err)
        } else {
            Self::server(code, &err)
        }
    }

    pub fn code(&self) -> CacheErrorCode {
        match self {
            Self::Client { code, .. } | Self::Server { code, .. } => *code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Client { message, .. } | Self::Server { message, .. } => message,
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client { .. })
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }
}

/// Result type alias for sequence cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read configuration file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(
            CacheErrorCode::CreateSequence.as_str(),
            "ERR_CACHE_CREATE_SEQ_ERROR"
        );
        assert_eq!(
            CacheErrorCode::AddMember.to_string(),
            "ERR_CACHE_SEQ_ADD_MEMBER_ERROR"
        );
        assert_eq!(
            serde_json::to_string(&CacheErrorCode::DropSequence).unwrap(),
            "\"ERR_CACHE_DROP_SEQ_ERROR\""
        );
        let parsed: CacheErrorCode =
            serde_json::from_str("\"ERR_CACHE_SEQ_REMOVE_MEMBER_ERROR\"").unwrap();
        assert_eq!(parsed, CacheErrorCode::RemoveMember);
    }

    #[test]
    fn test_only_get_members_is_read() {
        assert!(CacheErrorCode::GetMembers.is_read());
        assert!(!CacheErrorCode::CreateSequence.is_read());
        assert!(!CacheErrorCode::AddMember.is_read());
        assert!(!CacheErrorCode::RemoveMember.is_read());
        assert!(!CacheErrorCode::DropSequence.is_read());
    }

    #[test]
    fn test_missing_params_is_client_error() {
        let err = CacheError::missing_params(CacheErrorCode::CreateSequence);
        assert!(err.is_client());
        assert!(!err.is_server());
        assert_eq!(err.message(), REQUIRED_PARAMS_MISSING);
        assert!(err.source().is_none());
        let msg = format!("{}", err);
        assert!(msg.contains("ERR_CACHE_CREATE_SEQ_ERROR"));
        assert!(msg.contains("Required parameters are missing"));
    }

    #[test]
    fn test_write_server_error_drops_cause() {
        let store = StoreError::connection("refused");
        let err = CacheError::from_store(CacheErrorCode::AddMember, store);
        assert!(err.is_server());
        assert_eq!(err.code(), CacheErrorCode::AddMember);
        assert_eq!(err.message(), "Connection failed: refused");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_read_server_error_keeps_cause() {
        let store = StoreError::timeout("zrange");
        let err = CacheError::from_store(CacheErrorCode::GetMembers, store.clone());
        let source = err.source().expect("read errors chain their cause");
        assert_eq!(source.to_string(), store.to_string());
        match err {
            CacheError::Server { source, .. } => assert_eq!(source, Some(store)),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::command("WRONGTYPE").to_string(),
            "Store command failed: WRONGTYPE"
        );
        assert_eq!(StoreError::PoolClosed.to_string(), "Connection pool closed");
        assert!(StoreError::unavailable("down").to_string().contains("down"));
    }

    #[test]
    fn test_config_error_display_invalid_value() {
        let err = ConfigError::InvalidValue {
            field: "pool_max_size".to_string(),
            value: "0".to_string(),
            reason: "must be positive".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("pool_max_size"));
        assert!(msg.contains("0"));
        assert!(msg.contains("must be positive"));
    }
}
