//! In-memory backends for testing without Consul, etcd or DNS.
//!
//! Each mock reproduces the conditional-write semantics of the service it
//! stands in for, so the stores built on top of them behave as they would in
//! production.
//!
//! # Features
//!
//! - **Consul semantics**: per-key modify index, `cas=0` only while the key is absent
//! - **etcd semantics**: per-key version reset by delete, cluster-wide revision
//! - **Failure injection**: fail the next N requests with a transport error
//! - **Request counting**: track reads and writes for verification
//! - **Static DNS**: fixed A/AAAA and SRV answers with per-host failures
//!
//! # Example
//!
//! ```
//! use peerdisco::mock::MemoryEtcdKv;
//! use peerdisco::{EtcdStore, KeyScheme, LeaderRecord, LeaderStore};
//!
//! # tokio_test_block_on(async {
//! let kv = MemoryEtcdKv::new();
//! let store = EtcdStore::with_kv("rqlite", kv.clone(), KeyScheme::etcd()).unwrap();
//!
//! let record = LeaderRecord::new("node1", "http://node1:4001", "node1:4002");
//! assert!(store.initialize_leader(&record).await.unwrap());
//! assert_eq!(kv.version("/rqlite/leader"), 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::{
    collections::{HashMap, HashSet},
    net::IpAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use snafu::Snafu;

use crate::{
    error::{BoxError, DiscoError, Result},
    resolver::{NameResolver, SrvTarget},
    store::{consul::ConsulKv, etcd::EtcdKv},
};

/// Address reported by the in-memory KV mocks.
pub const MEMORY_ADDRESS: &str = "memory";

/// Failure injection and request counters shared by the KV mocks.
#[derive(Debug, Default)]
struct Counters {
    /// Number of transport errors to inject for the next requests.
    unavailable_count: AtomicUsize,

    /// Total read requests received.
    read_count: AtomicUsize,

    /// Total write requests received, including conditional writes.
    write_count: AtomicUsize,
}

impl Counters {
    /// Checks if we should inject a failure, decrementing the counter if so.
    fn should_inject_unavailable(&self) -> bool {
        loop {
            let current = self.unavailable_count.load(Ordering::SeqCst);
            if current == 0 {
                return false;
            }
            if self
                .unavailable_count
                .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn record_read(&self) -> bool {
        self.read_count.fetch_add(1, Ordering::SeqCst);
        self.should_inject_unavailable()
    }

    fn record_write(&self) -> bool {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        self.should_inject_unavailable()
    }
}

#[derive(Debug, Clone)]
struct ConsulEntry {
    value: Vec<u8>,
    modify_index: u64,
}

#[derive(Debug, Default)]
struct ConsulState {
    entries: HashMap<String, ConsulEntry>,
    /// Raft index of the last write; Consul indexes start at 1.
    index: u64,
}

/// In-memory [`ConsulKv`] with Consul's check-and-set rules.
///
/// Clones share state, so several stores built from clones of one mock
/// behave like nodes talking to the same agent.
#[derive(Debug, Clone, Default)]
pub struct MemoryConsulKv {
    state: Arc<Mutex<ConsulState>>,
    counters: Arc<Counters>,
}

impl MemoryConsulKv {
    /// Creates an empty KV.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` at `key` directly, bypassing check-and-set.
    pub fn insert(&self, key: &str, value: Vec<u8>) {
        let mut state = self.state.lock();
        state.index += 1;
        let modify_index = state.index;
        state.entries.insert(key.to_owned(), ConsulEntry { value, modify_index });
    }

    /// Deletes `key`. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Returns the value stored at `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().entries.get(key).map(|entry| entry.value.clone())
    }

    /// Returns the modify index of `key`, or `0` if it does not exist.
    #[must_use]
    pub fn modify_index(&self, key: &str) -> u64 {
        self.state.lock().entries.get(key).map_or(0, |entry| entry.modify_index)
    }

    /// Fails the next `count` requests with a 503 status.
    pub fn inject_unavailable(&self, count: usize) {
        self.counters.unavailable_count.store(count, Ordering::SeqCst);
    }

    /// Returns the total number of read requests received.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.counters.read_count.load(Ordering::SeqCst)
    }

    /// Returns the total number of write requests received.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.counters.write_count.load(Ordering::SeqCst)
    }

    fn unavailable(key: &str) -> DiscoError {
        DiscoError::ConsulStatus {
            key: key.to_owned(),
            status: 503,
            body: "Injected error".to_owned(),
        }
    }
}

#[async_trait]
impl ConsulKv for MemoryConsulKv {
    fn address(&self) -> &str {
        MEMORY_ADDRESS
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.counters.record_read() {
            return Err(Self::unavailable(key));
        }
        Ok(self.value(key))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        if self.counters.record_write() {
            return Err(Self::unavailable(key));
        }
        self.insert(key, value);
        Ok(())
    }

    async fn cas(&self, key: &str, value: Vec<u8>, modify_index: u64) -> Result<bool> {
        if self.counters.record_write() {
            return Err(Self::unavailable(key));
        }
        let mut state = self.state.lock();
        let current = state.entries.get(key).map_or(0, |entry| entry.modify_index);
        if current != modify_index {
            return Ok(false);
        }
        state.index += 1;
        let modify_index = state.index;
        state.entries.insert(key.to_owned(), ConsulEntry { value, modify_index });
        Ok(true)
    }
}

#[derive(Debug, Clone)]
struct EtcdEntry {
    value: Vec<u8>,
    version: i64,
    mod_revision: i64,
}

#[derive(Debug, Default)]
struct EtcdState {
    entries: HashMap<String, EtcdEntry>,
    revision: i64,
}

impl EtcdState {
    fn put(&mut self, key: &str, value: Vec<u8>) {
        self.revision += 1;
        let revision = self.revision;
        let entry = self.entries.entry(key.to_owned()).or_insert(EtcdEntry {
            value: Vec::new(),
            version: 0,
            mod_revision: 0,
        });
        entry.value = value;
        entry.version += 1;
        entry.mod_revision = revision;
    }
}

/// In-memory [`EtcdKv`] with etcd's version semantics.
///
/// Each put increments the key's version and the store's revision. Deleting
/// a key resets its version to `0`. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryEtcdKv {
    state: Arc<Mutex<EtcdState>>,
    counters: Arc<Counters>,
    endpoints: Vec<String>,
}

impl Default for MemoryEtcdKv {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            counters: Arc::default(),
            endpoints: vec![MEMORY_ADDRESS.to_owned()],
        }
    }
}

impl MemoryEtcdKv {
    /// Creates an empty KV.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` at `key` directly, bypassing any transaction.
    pub fn insert(&self, key: &str, value: Vec<u8>) {
        self.state.lock().put(key, value);
    }

    /// Deletes `key`. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let existed = state.entries.remove(key).is_some();
        if existed {
            state.revision += 1;
        }
        existed
    }

    /// Returns the value stored at `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().entries.get(key).map(|entry| entry.value.clone())
    }

    /// Returns the version of `key`, or `0` if it does not exist.
    #[must_use]
    pub fn version(&self, key: &str) -> i64 {
        self.state.lock().entries.get(key).map_or(0, |entry| entry.version)
    }

    /// Returns the revision of the last modification of `key`.
    #[must_use]
    pub fn mod_revision(&self, key: &str) -> Option<i64> {
        self.state.lock().entries.get(key).map(|entry| entry.mod_revision)
    }

    /// Returns the store-wide revision.
    #[must_use]
    pub fn revision(&self) -> i64 {
        self.state.lock().revision
    }

    /// Fails the next `count` requests with a connection error.
    pub fn inject_unavailable(&self, count: usize) {
        self.counters.unavailable_count.store(count, Ordering::SeqCst);
    }

    /// Returns the total number of read requests received.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.counters.read_count.load(Ordering::SeqCst)
    }

    /// Returns the total number of write requests received.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.counters.write_count.load(Ordering::SeqCst)
    }

    fn unavailable() -> DiscoError {
        let source = etcd_client::Error::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Injected error",
        ));
        DiscoError::Etcd { source, location: snafu::location!() }
    }
}

#[async_trait]
impl EtcdKv for MemoryEtcdKv {
    fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if self.counters.record_read() {
            return Err(Self::unavailable());
        }
        Ok(self.value(key))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        if self.counters.record_write() {
            return Err(Self::unavailable());
        }
        self.insert(key, value);
        Ok(())
    }

    async fn put_if_version(&self, key: &str, value: Vec<u8>, version: i64) -> Result<bool> {
        if self.counters.record_write() {
            return Err(Self::unavailable());
        }
        let mut state = self.state.lock();
        let current = state.entries.get(key).map_or(0, |entry| entry.version);
        if current != version {
            return Ok(false);
        }
        state.put(key, value);
        Ok(true)
    }
}

/// Error returned by [`StaticResolver`] for unknown or failing names.
#[derive(Debug, Snafu)]
#[snafu(display("{message}"))]
pub struct LookupFailure {
    message: String,
}

impl LookupFailure {
    fn boxed(message: String) -> BoxError {
        Box::new(LookupFailureSnafu { message }.build())
    }
}

#[derive(Debug, Default)]
struct ResolverState {
    ips: HashMap<String, Vec<IpAddr>>,
    srv: HashMap<String, Vec<SrvTarget>>,
    failing: HashSet<String>,
    ip_lookups: Vec<String>,
    srv_lookups: Vec<String>,
}

/// [`NameResolver`] with fixed answers.
///
/// Unknown names fail like `NXDOMAIN`. A name with an empty answer set
/// resolves successfully to nothing. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    state: Arc<RwLock<ResolverState>>,
}

impl StaticResolver {
    /// Creates a resolver with no answers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers A/AAAA queries for `host` with `ips`, in order.
    #[must_use]
    pub fn with_ips(self, host: &str, ips: impl IntoIterator<Item = IpAddr>) -> Self {
        self.state.write().ips.insert(host.to_owned(), ips.into_iter().collect());
        self
    }

    /// Answers the SRV query `_{service}._{proto}.{name}` with `targets`.
    #[must_use]
    pub fn with_srv(
        self,
        service: &str,
        proto: &str,
        name: &str,
        targets: impl IntoIterator<Item = SrvTarget>,
    ) -> Self {
        let query = srv_query(service, proto, name);
        self.state.write().srv.insert(query, targets.into_iter().collect());
        self
    }

    /// Makes every lookup of `host` fail.
    #[must_use]
    pub fn with_failing_host(self, host: &str) -> Self {
        self.fail_host(host);
        self
    }

    /// Makes every subsequent lookup of `host` fail.
    pub fn fail_host(&self, host: &str) {
        self.state.write().failing.insert(host.to_owned());
    }

    /// Lets lookups of `host` succeed again.
    pub fn restore_host(&self, host: &str) {
        self.state.write().failing.remove(host);
    }

    /// Returns the hosts passed to `lookup_ip`, in call order.
    #[must_use]
    pub fn ip_lookups(&self) -> Vec<String> {
        self.state.read().ip_lookups.clone()
    }

    /// Returns the SRV queries issued, in call order.
    #[must_use]
    pub fn srv_lookups(&self) -> Vec<String> {
        self.state.read().srv_lookups.clone()
    }
}

fn srv_query(service: &str, proto: &str, name: &str) -> String {
    format!("_{service}._{proto}.{name}")
}

#[async_trait]
impl NameResolver for StaticResolver {
    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, BoxError> {
        let mut state = self.state.write();
        state.ip_lookups.push(host.to_owned());
        if state.failing.contains(host) {
            return Err(LookupFailure::boxed(format!("lookup {host}: server misbehaving")));
        }
        state
            .ips
            .get(host)
            .cloned()
            .ok_or_else(|| LookupFailure::boxed(format!("lookup {host}: no such host")))
    }

    async fn lookup_srv(
        &self,
        service: &str,
        proto: &str,
        name: &str,
    ) -> Result<Vec<SrvTarget>, BoxError> {
        let query = srv_query(service, proto, name);
        let mut state = self.state.write();
        state.srv_lookups.push(query.clone());
        if state.failing.contains(name) {
            return Err(LookupFailure::boxed(format!("lookup {query}: server misbehaving")));
        }
        state
            .srv
            .get(&query)
            .cloned()
            .ok_or_else(|| LookupFailure::boxed(format!("lookup {query}: no such host")))
    }
}
