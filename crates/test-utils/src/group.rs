//! Discovery group names that never collide across tests.

use uuid::Uuid;

/// Returns `"{prefix}-{uuid}"`.
///
/// Tests that share a live Consul or etcd instance use this so their leader
/// keys never overlap.
pub fn unique_group(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}
