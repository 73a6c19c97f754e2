//! etcd leader store.
//!
//! `initialize_leader` runs one transaction: if `version(key) == 0` then put.
//! The version counter resets to zero when a key is deleted, so a deleted
//! leader key can be initialized again. A key holding an empty value reads as
//! "no leader".

use std::{fmt, time::Duration};

use async_trait::async_trait;
use etcd_client::{
    Certificate, Client, Compare, CompareOp, ConnectOptions, Identity, TlsOptions, Txn, TxnOp,
};
use peerdisco_types::{ClientStats, KeyScheme, LeaderKey, LeaderRecord};
use snafu::ResultExt;
use tracing::debug;

use super::{decode_record, encode_record};
use crate::{
    client::{DiscoveryClient, LeaderStore},
    config::{EtcdConfig, TlsConfig, read_file},
    error::{EtcdSnafu, KeySnafu, Result},
};

/// Mode tag reported by [`EtcdStore`].
pub const MODE: &str = "etcd-kv";

/// Minimal etcd KV surface used by [`EtcdStore`].
#[async_trait]
pub trait EtcdKv: Send + Sync {
    /// Returns the configured endpoints, for diagnostics.
    fn endpoints(&self) -> &[String];

    /// Reads the raw value at `key`. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value` at `key` unconditionally.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Writes `value` at `key` in one transaction guarded by
    /// `version(key) == version`. Returns whether the transaction committed.
    async fn put_if_version(&self, key: &str, value: Vec<u8>, version: i64) -> Result<bool>;
}

/// [`EtcdKv`] over the etcd gRPC API.
#[derive(Clone)]
pub struct GrpcEtcdKv {
    client: Client,
    endpoints: Vec<String>,
}

impl GrpcEtcdKv {
    /// Connects to the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns `DiscoError::Config` if the configuration is invalid,
    /// `DiscoError::Io` if TLS material cannot be read, or
    /// `DiscoError::Etcd` if the connection fails.
    pub async fn connect(config: &EtcdConfig) -> Result<Self> {
        config.validate()?;

        let mut options = ConnectOptions::new();
        if let Some((user, password)) = config.credentials() {
            options = options.with_user(user, password);
        }
        if let Some(ms) = config.connect_timeout_ms() {
            options = options.with_connect_timeout(Duration::from_millis(ms));
        }
        if let Some(tls) = config.tls() {
            options = options.with_tls(tls_options(tls)?);
        }

        let endpoints = config.endpoints().to_vec();
        let client = Client::connect(&endpoints, Some(options)).await.context(EtcdSnafu)?;
        debug!(endpoints = ?endpoints, "Connected to etcd");
        Ok(Self { client, endpoints })
    }
}

fn tls_options(tls: &TlsConfig) -> Result<TlsOptions> {
    let mut options = TlsOptions::new();
    let ca_certificates = tls.read_ca_certificates()?;
    if !ca_certificates.is_empty() {
        options = options.ca_certificate(Certificate::from_pem(ca_certificates.join(&b'\n')));
    }
    if let (Some(cert_file), Some(key_file)) = (&tls.cert_file, &tls.key_file) {
        options = options.identity(Identity::from_pem(read_file(cert_file)?, read_file(key_file)?));
    }
    if let Some(domain) = &tls.domain {
        options = options.domain_name(domain.clone());
    }
    Ok(options)
}

impl fmt::Debug for GrpcEtcdKv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrpcEtcdKv").field("endpoints", &self.endpoints).finish_non_exhaustive()
    }
}

#[async_trait]
impl EtcdKv for GrpcEtcdKv {
    fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let resp = self.client.kv_client().get(key, None).await.context(EtcdSnafu)?;
        Ok(resp.kvs().first().map(|kv| kv.value().to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.client.kv_client().put(key, value, None).await.context(EtcdSnafu)?;
        Ok(())
    }

    async fn put_if_version(&self, key: &str, value: Vec<u8>, version: i64) -> Result<bool> {
        let txn = Txn::new()
            .when([Compare::version(key, CompareOp::Equal, version)])
            .and_then([TxnOp::put(key, value, None)]);
        let resp = self.client.kv_client().txn(txn).await.context(EtcdSnafu)?;
        Ok(resp.succeeded())
    }
}

/// Leader store on etcd.
pub struct EtcdStore<K = GrpcEtcdKv> {
    kv: K,
    key: LeaderKey,
}

impl EtcdStore {
    /// Connects to etcd and creates a store for `group`.
    ///
    /// # Errors
    ///
    /// Returns `DiscoError::Key` if `group` is empty, or any error from
    /// [`GrpcEtcdKv::connect`].
    pub async fn connect(group: &str, config: &EtcdConfig) -> Result<Self> {
        let scheme = KeyScheme::new(config.key_prefix());
        // Reject a bad group before opening a connection.
        let key = scheme.leader_key(group).context(KeySnafu)?;
        let kv = GrpcEtcdKv::connect(config).await?;
        Ok(Self { kv, key })
    }
}

impl<K: EtcdKv> EtcdStore<K> {
    /// Creates a store for `group` on top of an existing KV client.
    ///
    /// # Errors
    ///
    /// Returns `DiscoError::Key` if `group` is empty.
    pub fn with_kv(group: &str, kv: K, scheme: KeyScheme) -> Result<Self> {
        let key = scheme.leader_key(group).context(KeySnafu)?;
        Ok(Self { kv, key })
    }

    /// Returns the leader key this store reads and writes.
    #[must_use]
    pub fn leader_key(&self) -> &LeaderKey {
        &self.key
    }

    /// Returns the underlying KV client.
    #[must_use]
    pub fn kv(&self) -> &K {
        &self.kv
    }
}

impl<K> fmt::Debug for EtcdStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtcdStore").field("key", &self.key).finish_non_exhaustive()
    }
}

impl<K> fmt::Display for EtcdStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MODE)
    }
}

impl<K: EtcdKv> DiscoveryClient for EtcdStore<K> {
    fn mode(&self) -> &'static str {
        MODE
    }

    fn stats(&self) -> ClientStats {
        ClientStats::new(MODE)
            .with_target("key", self.key.group())
            .with_target("leader_key", self.key.as_str())
            .with_target("endpoints", self.kv.endpoints())
    }
}

#[async_trait]
impl<K: EtcdKv> LeaderStore for EtcdStore<K> {
    async fn get_leader(&self) -> Result<Option<LeaderRecord>> {
        let key = self.key.as_str();
        match self.kv.get(key).await? {
            Some(bytes) if !bytes.is_empty() => decode_record(key, &bytes).map(Some),
            _ => Ok(None),
        }
    }

    async fn initialize_leader(&self, record: &LeaderRecord) -> Result<bool> {
        let key = self.key.as_str();
        let value = encode_record(key, record)?;
        let succeeded = self.kv.put_if_version(key, value, 0).await?;
        debug!(key, id = %record.id, succeeded, "Initialize leader");
        Ok(succeeded)
    }

    async fn set_leader(&self, record: &LeaderRecord) -> Result<()> {
        let key = self.key.as_str();
        let value = encode_record(key, record)?;
        self.kv.put(key, value).await?;
        debug!(key, id = %record.id, "Set leader");
        Ok(())
    }
}
