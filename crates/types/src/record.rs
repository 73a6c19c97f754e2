//! The leader record stored under a discovery group's leader key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of the node that won bootstrap-leader coordination.
///
/// Every field may be empty. Empty fields are left out of the encoded form
/// and decode back as empty strings, so records written by older or leaner
/// clients remain readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaderRecord {
    /// Opaque node identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// URL at which the node's client API is reachable.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_addr: String,

    /// Internal (consensus transport) address of the node.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub addr: String,
}

impl LeaderRecord {
    /// Creates a record from its three fields.
    pub fn new(id: impl Into<String>, api_addr: impl Into<String>, addr: impl Into<String>) -> Self {
        Self { id: id.into(), api_addr: api_addr.into(), addr: addr.into() }
    }

    /// Returns true if all three fields are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.api_addr.is_empty() && self.addr.is_empty()
    }
}

impl fmt::Display for LeaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (api={}, addr={})", self.id, self.api_addr, self.addr)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_fields() {
        let record = LeaderRecord::new("1", "http://localhost:4001", "localhost:4002");
        assert_eq!(record.id, "1");
        assert_eq!(record.api_addr, "http://localhost:4001");
        assert_eq!(record.addr, "localhost:4002");
        assert!(!record.is_empty());
    }

    #[test]
    fn test_default_is_empty() {
        assert!(LeaderRecord::default().is_empty());
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let record = LeaderRecord::new("node-1", "", "");
        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(json, r#"{"id":"node-1"}"#);
    }

    #[test]
    fn test_wire_field_names() {
        let record = LeaderRecord::new("2", "http://localhost:4003", "localhost:4004");
        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(
            json,
            r#"{"id":"2","api_addr":"http://localhost:4003","addr":"localhost:4004"}"#
        );
    }

    #[test]
    fn test_display() {
        let record = LeaderRecord::new("2", "http://localhost:4003", "localhost:4004");
        assert_eq!(record.to_string(), "2 (api=http://localhost:4003, addr=localhost:4004)");
    }
}
