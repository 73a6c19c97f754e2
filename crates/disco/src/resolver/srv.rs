//! DNS SRV discovery.
//!
//! Resolves `_{service}._tcp.{name}` to a set of targets, then resolves each
//! target to its IP addresses and pairs them with the target's SRV port.
//! Priority and weight are ignored. Any failure discards the partial result.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use peerdisco_types::ClientStats;
use snafu::ResultExt;
use tracing::{debug, trace};

use super::{LookupState, NameResolver, SystemResolver, hostport::join_host_port};
use crate::{
    client::{AddressResolver, DiscoveryClient},
    config::SrvConfig,
    error::{ResolutionSnafu, Result},
};

/// Mode tag reported by [`SrvClient`].
pub const MODE: &str = "dns-srv";

/// Protocol label used in SRV queries.
const PROTO: &str = "tcp";

/// Discovers peers through DNS SRV records.
#[derive(Debug)]
pub struct SrvClient {
    config: SrvConfig,
    resolver: Arc<dyn NameResolver>,
    state: LookupState,
}

impl SrvClient {
    /// Creates a client that resolves through the system resolver.
    #[must_use]
    pub fn new(config: SrvConfig) -> Self {
        Self::with_resolver(config, Arc::new(SystemResolver::new()))
    }

    /// Creates a client that resolves through `resolver`.
    pub fn with_resolver(config: SrvConfig, resolver: Arc<dyn NameResolver>) -> Self {
        Self { config, resolver, state: LookupState::default() }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SrvConfig {
        &self.config
    }

    async fn resolve(&self) -> Result<Vec<String>> {
        let (service, name) = (self.config.service(), self.config.name());
        let targets = self
            .resolver
            .lookup_srv(service, PROTO, name)
            .await
            .context(ResolutionSnafu { name: self.config.dns_name() })?;

        let mut addrs = Vec::new();
        for target in &targets {
            let ips = self
                .resolver
                .lookup_ip(&target.target)
                .await
                .context(ResolutionSnafu { name: target.target.as_str() })?;
            trace!(
                host = %target.target,
                port = target.port,
                count = ips.len(),
                "Resolved SRV target"
            );
            addrs.extend(ips.iter().map(|ip| join_host_port(&ip.to_string(), target.port)));
        }

        debug!(name, service, targets = targets.len(), count = addrs.len(), "Resolved SRV peers");
        Ok(addrs)
    }
}

impl fmt::Display for SrvClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MODE)
    }
}

impl DiscoveryClient for SrvClient {
    fn mode(&self) -> &'static str {
        MODE
    }

    fn stats(&self) -> ClientStats {
        let stats = ClientStats::new(MODE)
            .with_target("name", self.config.name())
            .with_target("service", self.config.service())
            .with_target("dns_name", self.config.dns_name());
        self.state.fill_stats(stats)
    }
}

#[async_trait]
impl AddressResolver for SrvClient {
    async fn lookup(&self) -> Result<Vec<String>> {
        let result = self.resolve().await;
        self.state.observe(result)
    }
}
