//! Namespaced key builder for cached sequences.
//!
//! Every sequence key has the layout
//!
//! ```text
//! {prefix}:seq:{graph_id byte length}:{graph_id}:{sequence_id}
//! ```
//!
//! The length field makes the encoding injective even when ids contain the
//! `:` separator, so two distinct `(graph_id, sequence_id)` pairs can never
//! share a key. The `seq` tag keeps sequence keys apart from other entity
//! kinds written under the same prefix.

use graphcache_core::config::DEFAULT_KEY_PREFIX;

/// Entity-kind tag for sequence membership keys.
pub const SEQUENCE_TAG: &str = "seq";

/// Builds and parses store keys under one namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceKeyBuilder {
    prefix: String,
}

impl Default for SequenceKeyBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl SequenceKeyBuilder {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key holding the sorted membership of one sequence. Never fails.
    pub fn sequence_key(&self, graph_id: &str, sequence_id: &str) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.prefix,
            SEQUENCE_TAG,
            graph_id.len(),
            graph_id,
            sequence_id
        )
    }

    /// Recover `(graph_id, sequence_id)` from a key built by this builder.
    ///
    /// Returns `None` for keys under another prefix or entity kind, and for
    /// anything malformed.
    pub fn parse<'k>(&self, key: &'k str) -> Option<(&'k str, &'k str)> {
        let rest = key.strip_prefix(self.prefix.as_str())?;
        let rest = rest.strip_prefix(':')?;
        let rest = rest.strip_prefix(SEQUENCE_TAG)?;
        let rest = rest.strip_prefix(':')?;

        let (len, rest) = rest.split_once(':')?;
        if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let len: usize = len.parse().ok()?;

        let graph_id = rest.get(..len)?;
        let sequence_id = rest.get(len..)?.strip_prefix(':')?;
        Some((graph_id, sequence_id))
    }
}

/// Sequence key under the default `graph` namespace.
pub fn sequence_key(graph_id: &str, sequence_id: &str) -> String {
    SequenceKeyBuilder::default().sequence_key(graph_id, sequence_id)
}
