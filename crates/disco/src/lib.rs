//! Cluster-bootstrap discovery for distributed databases.
//!
//! A node that has not yet joined its cluster uses this crate to find peer
//! addresses and to agree, through an external key-value store, on which
//! node bootstraps the cluster.
//!
//! # Backends
//!
//! - **DNS** ([`DnsClient`]): resolve one hostname, pair every IP with a fixed port
//! - **DNS SRV** ([`SrvClient`]): resolve SRV targets, then each target's IPs
//! - **Consul KV** ([`ConsulStore`]): leader record written with `cas=0`
//! - **etcd** ([`EtcdStore`]): leader record written in a `version == 0` transaction
//!
//! Resolvers implement [`AddressResolver`]; stores implement [`LeaderStore`].
//! Both extend [`DiscoveryClient`], which provides the mode tag and a
//! [`ClientStats`] snapshot.
//!
//! # Quick Start
//!
//! ```no_run
//! use peerdisco::{ConsulConfig, ConsulStore, LeaderRecord, LeaderStore};
//!
//! # async fn run() -> peerdisco::Result<()> {
//! let store = ConsulStore::new("rqlite", &ConsulConfig::default())?;
//!
//! let me = LeaderRecord::new("node1", "http://10.0.0.1:4001", "10.0.0.1:4002");
//! if store.get_leader().await?.is_none() && store.initialize_leader(&me).await? {
//!     // This node bootstraps the cluster.
//! }
//! let leader = store.get_leader().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │               Bootstrap orchestrator (caller)            │
//! ├────────────────────────────┬─────────────────────────────┤
//! │      AddressResolver       │        LeaderStore          │
//! │   DnsClient │ SrvClient    │  ConsulStore │ EtcdStore    │
//! ├────────────────────────────┼─────────────────────────────┤
//! │  NameResolver (hickory)    │ ConsulKv (reqwest) │        │
//! │  StaticResolver (mock)     │ EtcdKv (etcd-client)        │
//! └────────────────────────────┴─────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
pub mod mock;
pub mod resolver;
pub mod store;

// Public API exports
pub use client::{AddressResolver, DiscoveryClient, JOIN_SCHEMES, LeaderStore};
pub use config::{
    BasicAuthConfig, ConsulConfig, DEFAULT_CONSUL_ADDRESS, DEFAULT_CONSUL_KEY_PREFIX,
    DEFAULT_CONSUL_SCHEME, DEFAULT_ETCD_ENDPOINT, DEFAULT_ETCD_KEY_PREFIX, DEFAULT_NAME,
    DEFAULT_OVERRIDE_ENV, DEFAULT_PORT, DEFAULT_SERVICE, DnsConfig, EtcdConfig, SrvConfig,
    TlsConfig,
};
pub use error::{BoxError, DiscoError, ErrorKind, Result};
pub use resolver::{NameResolver, SrvTarget, SystemResolver, dns::DnsClient, srv::SrvClient};
pub use store::{
    consul::{ConsulKv, ConsulStore, HttpConsulKv},
    etcd::{EtcdKv, EtcdStore, GrpcEtcdKv},
};

// Re-export shared types
pub use peerdisco_types::{ClientStats, KeyScheme, LeaderKey, LeaderRecord};
