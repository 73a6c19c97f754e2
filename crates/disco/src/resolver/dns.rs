//! Plain-name DNS discovery.
//!
//! Resolves a hostname to its A/AAAA records and pairs every address with a
//! fixed port. An environment variable holding a comma-separated list of
//! `host:port` entries replaces resolution entirely when set.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use peerdisco_types::ClientStats;
use snafu::{ResultExt, ensure};
use tracing::debug;

use super::{LookupState, NameResolver, SystemResolver, hostport};
use crate::{
    client::{AddressResolver, DiscoveryClient},
    config::DnsConfig,
    error::{InvalidOverrideAddressSnafu, ResolutionSnafu, Result},
};

/// Mode tag reported by [`DnsClient`].
pub const MODE: &str = "dns";

type EnvSource = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Discovers peers by resolving a single hostname.
pub struct DnsClient {
    config: DnsConfig,
    resolver: Arc<dyn NameResolver>,
    env: EnvSource,
    state: LookupState,
}

impl DnsClient {
    /// Creates a client that resolves through the system resolver.
    #[must_use]
    pub fn new(config: DnsConfig) -> Self {
        Self::with_resolver(config, Arc::new(SystemResolver::new()))
    }

    /// Creates a client that resolves through `resolver`.
    pub fn with_resolver(config: DnsConfig, resolver: Arc<dyn NameResolver>) -> Self {
        Self {
            config,
            resolver,
            env: Arc::new(|var: &str| std::env::var(var).ok()),
            state: LookupState::default(),
        }
    }

    /// Replaces the source consulted for the address override.
    ///
    /// Defaults to the process environment.
    #[must_use]
    pub fn with_env_source<F>(mut self, source: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(source);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &DnsConfig {
        &self.config
    }

    fn override_addresses(&self) -> Option<String> {
        let var = self.config.override_env()?;
        (self.env)(var).filter(|value| !value.trim().is_empty())
    }

    async fn resolve(&self) -> Result<Vec<String>> {
        if let Some(value) = self.override_addresses() {
            let addrs = parse_override(&value)?;
            debug!(count = addrs.len(), "Using DNS address override");
            return Ok(addrs);
        }

        let name = self.config.name();
        let ips = self.resolver.lookup_ip(name).await.context(ResolutionSnafu { name })?;
        let port = self.config.port();
        let addrs: Vec<String> =
            ips.iter().map(|ip| hostport::join_host_port(&ip.to_string(), port)).collect();
        debug!(name, count = addrs.len(), "Resolved DNS peers");
        Ok(addrs)
    }
}

/// Parses a comma-separated override list.
///
/// Entries are trimmed and returned in order. Every entry must be a valid
/// `host:port`; one malformed entry rejects the whole list.
///
/// # Errors
///
/// Returns `DiscoError::InvalidOverrideAddress` naming the first malformed entry.
pub fn parse_override(value: &str) -> Result<Vec<String>> {
    let mut addrs = Vec::new();
    for entry in value.split(',').map(str::trim) {
        ensure!(hostport::is_host_port(entry), InvalidOverrideAddressSnafu { entry });
        addrs.push(entry.to_owned());
    }
    Ok(addrs)
}

impl fmt::Debug for DnsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsClient")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for DnsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MODE)
    }
}

impl DiscoveryClient for DnsClient {
    fn mode(&self) -> &'static str {
        MODE
    }

    fn stats(&self) -> ClientStats {
        let stats = ClientStats::new(MODE)
            .with_target("name", self.config.name())
            .with_target("port", self.config.port());
        let stats = match self.config.override_env() {
            Some(var) => stats.with_target("override_env", var),
            None => stats,
        };
        self.state.fill_stats(stats)
    }
}

#[async_trait]
impl AddressResolver for DnsClient {
    async fn lookup(&self) -> Result<Vec<String>> {
        let result = self.resolve().await;
        self.state.observe(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::net::IpAddr;

    use super::*;
    use crate::{error::ErrorKind, mock::StaticResolver};

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn client(resolver: &StaticResolver, config: DnsConfig) -> DnsClient {
        DnsClient::with_resolver(config, Arc::new(resolver.clone())).with_env_source(|_| None)
    }

    #[tokio::test]
    async fn test_single_address() {
        let resolver = StaticResolver::new().with_ips("rqlite", [ip("8.8.8.8")]);
        let client = client(&resolver, DnsConfig::default());

        let addrs = client.lookup().await.expect("lookup");
        assert_eq!(addrs, ["8.8.8.8:4001"]);
        assert_eq!(resolver.ip_lookups(), ["rqlite"]);
    }

    #[tokio::test]
    async fn test_multiple_addresses_keep_resolver_order() {
        let resolver = StaticResolver::new().with_ips("qux", [ip("1.2.3.4"), ip("5.6.7.8")]);
        let config = DnsConfig::builder().name("qux").port(8080).build();
        let client = client(&resolver, config);

        let addrs = client.lookup().await.expect("lookup");
        assert_eq!(addrs, ["1.2.3.4:8080", "5.6.7.8:8080"]);
    }

    #[tokio::test]
    async fn test_ipv6_is_bracketed() {
        let resolver = StaticResolver::new().with_ips("rqlite", [ip("2001:db8::68")]);
        let client = client(&resolver, DnsConfig::default());

        assert_eq!(client.lookup().await.expect("lookup"), ["[2001:db8::68]:4001"]);
    }

    #[tokio::test]
    async fn test_no_records_is_empty_success() {
        let resolver = StaticResolver::new().with_ips("rqlite", Vec::<IpAddr>::new());
        let client = client(&resolver, DnsConfig::default());

        assert!(client.lookup().await.expect("lookup").is_empty());
        assert!(client.stats().last_contact.is_some());
    }

    #[tokio::test]
    async fn test_resolution_failure_names_host() {
        let resolver = StaticResolver::new().with_failing_host("rqlite");
        let client = client(&resolver, DnsConfig::default());

        let err = client.lookup().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(err.to_string().contains("rqlite"));
    }

    #[tokio::test]
    async fn test_override_wins_over_resolution() {
        let resolver = StaticResolver::new().with_ips("rqlite", [ip("8.8.8.8")]);
        let client = DnsClient::with_resolver(DnsConfig::default(), Arc::new(resolver.clone()))
            .with_env_source(|var| {
                (var == "PEERDISCO_DNS_ADDRESSES").then(|| "1.2.3.4:4001".to_owned())
            });

        assert_eq!(client.lookup().await.expect("lookup"), ["1.2.3.4:4001"]);
        assert!(resolver.ip_lookups().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_override_fails_whole_call() {
        let resolver = StaticResolver::new().with_ips("rqlite", [ip("8.8.8.8")]);
        let client = DnsClient::with_resolver(DnsConfig::default(), Arc::new(resolver))
            .with_env_source(|_| Some("1.2.3.4:4001,5.6.7.8".to_owned()));

        let err = client.lookup().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverrideFormat);
        assert!(err.to_string().contains("5.6.7.8"));
        assert!(client.stats().last_addresses.is_none());
    }

    #[tokio::test]
    async fn test_blank_override_falls_back_to_resolution() {
        let resolver = StaticResolver::new().with_ips("rqlite", [ip("8.8.8.8")]);
        let client = DnsClient::with_resolver(DnsConfig::default(), Arc::new(resolver))
            .with_env_source(|_| Some("  ".to_owned()));

        assert_eq!(client.lookup().await.expect("lookup"), ["8.8.8.8:4001"]);
    }

    #[tokio::test]
    async fn test_disabled_override_is_never_read() {
        let resolver = StaticResolver::new().with_ips("rqlite", [ip("8.8.8.8")]);
        let config = DnsConfig::builder().override_env("").build();
        let client = DnsClient::with_resolver(config, Arc::new(resolver))
            .with_env_source(|_| Some("1.2.3.4:4001".to_owned()));

        assert_eq!(client.lookup().await.expect("lookup"), ["8.8.8.8:4001"]);
        assert!(client.stats().target("override_env").is_none());
    }

    #[tokio::test]
    async fn test_stats_keep_last_success_after_failure() {
        let resolver = StaticResolver::new().with_ips("rqlite", [ip("8.8.8.8")]);
        let client = client(&resolver, DnsConfig::default());
        client.lookup().await.expect("lookup");

        resolver.fail_host("rqlite");
        assert!(client.lookup().await.is_err());

        let stats = client.stats();
        assert_eq!(stats.mode, "dns");
        assert_eq!(stats.last_addresses, Some(vec!["8.8.8.8:4001".to_owned()]));
        assert!(stats.last_error.is_some());
        assert_eq!(stats.target("name"), Some(&serde_json::json!("rqlite")));
        assert_eq!(stats.target("port"), Some(&serde_json::json!(4001)));
    }

    #[tokio::test]
    async fn test_lookup_urls() {
        let resolver = StaticResolver::new().with_ips("rqlite", [ip("8.8.8.8")]);
        let client = client(&resolver, DnsConfig::default());

        let urls = client.lookup_urls().await.expect("lookup urls");
        let schemes: Vec<&str> = urls.iter().map(url::Url::scheme).collect();
        assert_eq!(schemes, ["http", "https", "raft"]);
    }

    #[test]
    fn test_display_is_mode() {
        let client = client(&StaticResolver::new(), DnsConfig::default());
        assert_eq!(client.to_string(), "dns");
        assert_eq!(client.mode(), "dns");
    }

    #[test]
    fn test_parse_override_trims_entries() {
        let addrs = parse_override(" 1.2.3.4:4001 , [::1]:4002").expect("parse");
        assert_eq!(addrs, ["1.2.3.4:4001", "[::1]:4002"]);
    }

    #[test]
    fn test_parse_override_rejects_empty_entry() {
        let err = parse_override("1.2.3.4:4001,").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OverrideFormat);
    }
}
