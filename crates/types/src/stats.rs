//! Point-in-time diagnostics snapshot shared by every discovery client.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Diagnostics for a single discovery client.
///
/// `target` holds what the client queries (a hostname, an SRV service, a
/// leader key). The `last_*` fields are only populated by resolvers:
/// `last_contact` and `last_addresses` describe the most recent successful
/// lookup, `last_error` the most recent failed one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    /// Backend tag, e.g. `dns` or `etcd-kv`.
    pub mode: String,

    /// Query target fields, rendered at the top level when serialized.
    #[serde(flatten)]
    pub target: BTreeMap<String, Value>,

    /// Error from the most recent failed lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// Completion time of the most recent successful lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<DateTime<Utc>>,

    /// Addresses returned by the most recent successful lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_addresses: Option<Vec<String>>,
}

impl ClientStats {
    /// Creates an empty snapshot for the given backend tag.
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            target: BTreeMap::new(),
            last_error: None,
            last_contact: None,
            last_addresses: None,
        }
    }

    /// Adds a query target field.
    #[must_use]
    pub fn with_target(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.target.insert(key.into(), value.into());
        self
    }

    /// Returns a query target field.
    #[must_use]
    pub fn target(&self, key: &str) -> Option<&Value> {
        self.target.get(key)
    }

    /// Renders the snapshot as a flat JSON object.
    ///
    /// Conditional keys (`last_error`, `last_contact`, `last_addresses`) are
    /// present only when set.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("mode".to_owned(), Value::String(self.mode.clone()));
        for (key, value) in &self.target {
            map.insert(key.clone(), value.clone());
        }
        if let Some(error) = &self.last_error {
            map.insert("last_error".to_owned(), Value::String(error.clone()));
        }
        if let Some(contact) = &self.last_contact {
            map.insert(
                "last_contact".to_owned(),
                Value::String(contact.to_rfc3339_opts(SecondsFormat::Millis, true)),
            );
        }
        if let Some(addresses) = &self.last_addresses {
            map.insert(
                "last_addresses".to_owned(),
                Value::Array(addresses.iter().cloned().map(Value::String).collect()),
            );
        }
        map
    }
}
