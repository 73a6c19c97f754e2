//! Capability traits implemented by every discovery backend.
//!
//! Backends come in two shapes. Resolvers ([`AddressResolver`]) turn a
//! configured name into candidate peer addresses. Leader stores
//! ([`LeaderStore`]) hold a single leader record per discovery group and
//! arbitrate which node bootstraps the cluster. A bootstrap orchestrator
//! depends on whichever trait matches its configured backend.

use std::fmt;

use async_trait::async_trait;
use peerdisco_types::{ClientStats, LeaderRecord};
use snafu::ResultExt;
use url::Url;

use crate::error::{InvalidUrlSnafu, Result};

/// URL schemes produced by [`AddressResolver::lookup_urls`], in order.
pub const JOIN_SCHEMES: [&str; 3] = ["http", "https", "raft"];

/// Behaviour shared by every discovery client.
///
/// `Display` renders the backend tag returned by [`mode`](Self::mode).
pub trait DiscoveryClient: fmt::Display + Send + Sync {
    /// Returns the backend tag, e.g. `dns` or `consul-kv`.
    fn mode(&self) -> &'static str;

    /// Returns a diagnostics snapshot.
    ///
    /// Never fails and never performs I/O, so it is safe to call from the
    /// bootstrap path.
    fn stats(&self) -> ClientStats;
}

/// Resolves a configured name into candidate `host:port` peer addresses.
#[async_trait]
pub trait AddressResolver: DiscoveryClient {
    /// Resolves the configured name.
    ///
    /// Returns addresses in resolver order. An empty list is a valid result.
    ///
    /// # Errors
    ///
    /// Returns `DiscoError::Resolution` if resolution fails, or
    /// `DiscoError::InvalidOverrideAddress` if an address override is malformed.
    async fn lookup(&self) -> Result<Vec<String>>;

    /// Resolves the configured name and expands each address into one URL
    /// per scheme in [`JOIN_SCHEMES`].
    ///
    /// Only one of the URLs for an address is expected to work; all are
    /// returned so a joining node can try each.
    ///
    /// # Errors
    ///
    /// Returns any error from [`lookup`](Self::lookup), or
    /// `DiscoError::InvalidUrl` if an address cannot form a URL.
    async fn lookup_urls(&self) -> Result<Vec<Url>> {
        let addrs = self.lookup().await?;
        join_urls(&addrs)
    }
}

/// Stores the bootstrap leader record for one discovery group.
#[async_trait]
pub trait LeaderStore: DiscoveryClient {
    /// Reads the current leader record.
    ///
    /// Returns `Ok(None)` when no leader has been recorded yet.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the store is unreachable, or
    /// `DiscoError::Codec` if the stored value is not a leader record.
    async fn get_leader(&self) -> Result<Option<LeaderRecord>>;

    /// Writes `record` only if no leader has been recorded.
    ///
    /// Returns `true` if this call wrote the record. Across any number of
    /// concurrent callers targeting the same group, at most one succeeds.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the store is unreachable.
    async fn initialize_leader(&self, record: &LeaderRecord) -> Result<bool>;

    /// Unconditionally overwrites the leader record.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the store is unreachable.
    async fn set_leader(&self, record: &LeaderRecord) -> Result<()>;
}

/// Expands `host:port` addresses into join URLs, grouped by address.
pub(crate) fn join_urls(addrs: &[String]) -> Result<Vec<Url>> {
    let mut urls = Vec::with_capacity(addrs.len() * JOIN_SCHEMES.len());
    for addr in addrs {
        for scheme in JOIN_SCHEMES {
            let url = format!("{scheme}://{addr}");
            urls.push(Url::parse(&url).context(InvalidUrlSnafu { url })?);
        }
    }
    Ok(urls)
}
