//! Live backend endpoints for opt-in integration tests.

use peerdisco::{ConsulConfig, EtcdConfig};

/// Environment variable naming a Consul agent as `host:port`.
pub const CONSUL_ADDRESS_ENV: &str = "PEERDISCO_CONSUL_ADDRESS";

/// Environment variable naming comma-separated etcd endpoints.
pub const ETCD_ENDPOINTS_ENV: &str = "PEERDISCO_ETCD_ENDPOINTS";

/// Backends reachable from the test environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveBackends {
    /// Consul agent address, if configured.
    pub consul: Option<String>,
    /// etcd endpoints, if configured.
    pub etcd: Option<Vec<String>>,
}

impl LiveBackends {
    /// Reads [`CONSUL_ADDRESS_ENV`] and [`ETCD_ENDPOINTS_ENV`].
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the set from an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let consul = lookup(CONSUL_ADDRESS_ENV)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let etcd = lookup(ETCD_ENDPOINTS_ENV)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|endpoint| !endpoint.is_empty())
                    .map(str::to_owned)
                    .collect::<Vec<_>>()
            })
            .filter(|endpoints| !endpoints.is_empty());
        Self { consul, etcd }
    }

    /// Returns a Consul configuration for the live agent.
    pub fn consul_config(&self) -> Option<ConsulConfig> {
        self.consul.as_ref().map(|address| ConsulConfig::builder().address(address).build())
    }

    /// Returns an etcd configuration for the live cluster.
    pub fn etcd_config(&self) -> Option<EtcdConfig> {
        self.etcd
            .as_ref()
            .map(|endpoints| EtcdConfig::builder().endpoints(endpoints.clone()).build())
    }
}
