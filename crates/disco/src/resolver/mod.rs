//! Name resolution for address-based discovery.
//!
//! The resolvers in this module depend on a [`NameResolver`] rather than
//! on DNS directly. Production code uses [`SystemResolver`]; tests inject
//! [`StaticResolver`](crate::mock::StaticResolver) for deterministic answers.

pub mod dns;
pub mod hostport;
pub mod srv;
mod state;

use std::{fmt, net::IpAddr};

use async_trait::async_trait;
use hickory_resolver::{
    Resolver, TokioResolver,
    config::{LookupIpStrategy, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
};
use tracing::debug;

use crate::error::BoxError;

pub(crate) use state::LookupState;

/// One SRV answer, reduced to what discovery uses.
///
/// Priority, weight and TTL are deliberately dropped: every target is a
/// bootstrap candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SrvTarget {
    /// Target hostname.
    pub target: String,
    /// Port the target serves the service on.
    pub port: u16,
}

impl SrvTarget {
    /// Creates a target.
    pub fn new(target: impl Into<String>, port: u16) -> Self {
        Self { target: target.into(), port }
    }
}

/// Underlying name and service resolution.
#[async_trait]
pub trait NameResolver: fmt::Debug + Send + Sync {
    /// Resolves `host` to its A/AAAA addresses.
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, BoxError>;

    /// Resolves the SRV records for `_{service}._{proto}.{name}`.
    async fn lookup_srv(
        &self,
        service: &str,
        proto: &str,
        name: &str,
    ) -> Result<Vec<SrvTarget>, BoxError>;
}

/// [`NameResolver`] backed by the system's DNS configuration.
#[derive(Debug, Clone)]
pub struct SystemResolver {
    inner: TokioResolver,
}

impl SystemResolver {
    /// Creates a resolver from `/etc/resolv.conf` and the hosts file.
    ///
    /// Falls back to the library's default upstream configuration if the
    /// system configuration cannot be read. A and AAAA records are both
    /// queried and every address is returned.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = match TokioResolver::builder_tokio() {
            Ok(builder) => builder,
            Err(e) => {
                debug!(error = %e, "System resolver configuration unavailable, using defaults");
                Resolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                )
            },
        };
        apply_options(builder.options_mut());
        Self { inner: builder.build() }
    }
}

/// Dual-stack peers keep both families: no AAAA answer is dropped in favor
/// of an A answer.
fn apply_options(opts: &mut ResolverOpts) {
    opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameResolver for SystemResolver {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, BoxError> {
        let lookup = self.inner.lookup_ip(host).await?;
        Ok(lookup.iter().collect())
    }

    async fn lookup_srv(
        &self,
        service: &str,
        proto: &str,
        name: &str,
    ) -> Result<Vec<SrvTarget>, BoxError> {
        let query = format!("_{service}._{proto}.{name}");
        let lookup = self.inner.srv_lookup(query).await?;
        Ok(lookup.iter().map(|srv| SrvTarget::new(srv.target().to_utf8(), srv.port())).collect())
    }
}
