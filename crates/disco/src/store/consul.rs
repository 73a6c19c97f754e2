//! Consul KV leader store.
//!
//! `initialize_leader` issues a check-and-set with `cas=0`, which Consul
//! applies only when the key does not exist. `set_leader` is a plain `PUT`.

use std::fmt;

use async_trait::async_trait;
use peerdisco_types::{ClientStats, KeyScheme, LeaderKey, LeaderRecord};
use reqwest::{Certificate, Identity, Method, RequestBuilder, StatusCode};
use snafu::{ResultExt, ensure};
use tracing::debug;
use url::Url;

use super::{decode_record, encode_record};
use crate::{
    client::{DiscoveryClient, LeaderStore},
    config::{BasicAuthConfig, ConsulConfig, TlsConfig, read_file},
    error::{ConfigSnafu, ConsulHttpSnafu, DiscoError, InvalidUrlSnafu, KeySnafu, Result},
};

/// Mode tag reported by [`ConsulStore`].
pub const MODE: &str = "consul-kv";

/// Header carrying the Consul ACL token.
const TOKEN_HEADER: &str = "X-Consul-Token";

/// Minimal Consul KV surface used by [`ConsulStore`].
#[async_trait]
pub trait ConsulKv: Send + Sync {
    /// Returns the agent address, for diagnostics.
    fn address(&self) -> &str;

    /// Reads the raw value at `key`. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value` at `key` unconditionally.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Writes `value` at `key` if the key's modify index equals `modify_index`.
    ///
    /// An index of `0` means "only if the key does not exist".
    /// Returns whether the write was applied.
    async fn cas(&self, key: &str, value: Vec<u8>, modify_index: u64) -> Result<bool>;
}

/// [`ConsulKv`] over the Consul HTTP API.
pub struct HttpConsulKv {
    client: reqwest::Client,
    address: String,
    base: Url,
    token: Option<String>,
    basic_auth: Option<BasicAuthConfig>,
    params: Vec<(&'static str, String)>,
}

impl HttpConsulKv {
    /// Builds an HTTP client for the configured agent.
    ///
    /// Reads the token file and TLS material once. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns `DiscoError::Config` if the configuration is invalid,
    /// `DiscoError::Io` if a token or TLS file cannot be read, or
    /// `DiscoError::ConsulHttp` if the TLS material is rejected.
    pub fn new(config: &ConsulConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(tls) = config.tls() {
            builder = apply_tls(builder, tls)?;
        }
        let client = builder.build().context(ConsulHttpSnafu)?;
        let url = format!("{}://{}/v1/kv", config.scheme(), config.address());
        let base = Url::parse(&url).context(InvalidUrlSnafu { url })?;

        let mut params = Vec::new();
        if let Some(dc) = config.datacenter() {
            params.push(("dc", dc.to_owned()));
        }
        if let Some(ns) = config.namespace() {
            params.push(("ns", ns.to_owned()));
        }
        if let Some(partition) = config.partition() {
            params.push(("partition", partition.to_owned()));
        }

        Ok(Self {
            client,
            address: config.address().to_owned(),
            base,
            token: config.resolve_token()?,
            basic_auth: config.basic_auth().cloned(),
            params,
        })
    }

    /// Builds the KV endpoint URL for `key`.
    ///
    /// Each `/`-separated segment is percent-encoded, so `?`, `#` and `%` in a
    /// key stay part of the path.
    fn url(&self, key: &str) -> Result<Url> {
        let invalid = key.split('/').find(|segment| matches!(*segment, "" | "." | ".."));
        ensure!(
            invalid.is_none(),
            ConfigSnafu { message: format!("consul key '{key}' has an empty, '.' or '..' segment") }
        );
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| DiscoError::Config {
                message: format!("consul address '{}' is not a base URL", self.address),
            })?
            .extend(key.split('/'));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut req = self.client.request(method, url).query(&self.params);
        if let Some(token) = &self.token {
            req = req.header(TOKEN_HEADER, token);
        }
        if let Some(auth) = &self.basic_auth {
            req = req.basic_auth(&auth.username, Some(&auth.password));
        }
        req
    }

    async fn send(&self, key: &str, req: RequestBuilder) -> Result<reqwest::Response> {
        let resp = req.send().await.context(ConsulHttpSnafu)?;
        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DiscoError::ConsulStatus { key: key.to_owned(), status: status.as_u16(), body })
    }
}

fn apply_tls(
    mut builder: reqwest::ClientBuilder,
    tls: &TlsConfig,
) -> Result<reqwest::ClientBuilder> {
    for pem in tls.read_ca_certificates()? {
        let cert = Certificate::from_pem(&pem).context(ConsulHttpSnafu)?;
        builder = builder.add_root_certificate(cert);
    }
    if let (Some(cert_file), Some(key_file)) = (&tls.cert_file, &tls.key_file) {
        let mut pem = read_file(cert_file)?;
        pem.extend(read_file(key_file)?);
        builder = builder.identity(Identity::from_pem(&pem).context(ConsulHttpSnafu)?);
    }
    Ok(builder.danger_accept_invalid_certs(tls.insecure_skip_verify))
}

impl fmt::Debug for HttpConsulKv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConsulKv")
            .field("base", &self.base.as_str())
            .field("params", &self.params)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ConsulKv for HttpConsulKv {
    fn address(&self) -> &str {
        &self.address
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut url = self.url(key)?;
        url.query_pairs_mut().append_key_only("raw");
        let req = self.request(Method::GET, url);
        let resp = self.send(key, req).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.bytes().await.context(ConsulHttpSnafu)?;
        Ok(Some(body.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let req = self.request(Method::PUT, self.url(key)?).body(value);
        let resp = self.send(key, req).await?;
        ensure_found(key, &resp)
    }

    async fn cas(&self, key: &str, value: Vec<u8>, modify_index: u64) -> Result<bool> {
        let mut url = self.url(key)?;
        url.query_pairs_mut().append_pair("cas", &modify_index.to_string());
        let req = self.request(Method::PUT, url).body(value);
        let resp = self.send(key, req).await?;
        ensure_found(key, &resp)?;
        let body = resp.text().await.context(ConsulHttpSnafu)?;
        Ok(body.trim() == "true")
    }
}

/// A write answered with 404 is reported as a bad status.
fn ensure_found(key: &str, resp: &reqwest::Response) -> Result<()> {
    if resp.status() == StatusCode::NOT_FOUND {
        return Err(DiscoError::ConsulStatus {
            key: key.to_owned(),
            status: StatusCode::NOT_FOUND.as_u16(),
            body: String::new(),
        });
    }
    Ok(())
}

/// Leader store on Consul KV.
pub struct ConsulStore<K = HttpConsulKv> {
    kv: K,
    key: LeaderKey,
}

impl ConsulStore {
    /// Creates a store for `group` talking to the configured Consul agent.
    ///
    /// # Errors
    ///
    /// Returns `DiscoError::Key` if `group` is empty, or any error from
    /// [`HttpConsulKv::new`].
    pub fn new(group: &str, config: &ConsulConfig) -> Result<Self> {
        let kv = HttpConsulKv::new(config)?;
        Self::with_kv(group, kv, KeyScheme::new(config.key_prefix()))
    }
}

impl<K: ConsulKv> ConsulStore<K> {
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

impl<K> fmt::Debug for ConsulStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsulStore").field("key", &self.key).finish_non_exhaustive()
    }
}

impl<K> fmt::Display for ConsulStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MODE)
    }
}

impl<K: ConsulKv> DiscoveryClient for ConsulStore<K> {
    fn mode(&self) -> &'static str {
        MODE
    }

    fn stats(&self) -> ClientStats {
        ClientStats::new(MODE)
            .with_target("key", self.key.group())
            .with_target("leader_key", self.key.as_str())
            .with_target("address", self.kv.address())
    }
}

#[async_trait]
impl<K: ConsulKv> LeaderStore for ConsulStore<K> {
    async fn get_leader(&self) -> Result<Option<LeaderRecord>> {
        let key = self.key.as_str();
        match self.kv.get(key).await? {
            Some(bytes) => decode_record(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    async fn initialize_leader(&self, record: &LeaderRecord) -> Result<bool> {
        let key = self.key.as_str();
        let value = encode_record(key, record)?;
        let succeeded = self.kv.cas(key, value, 0).await?;
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
        task::JoinHandle,
    };

    use super::*;
    use crate::{error::ErrorKind, mock::MemoryConsulKv};

    fn record(id: &str) -> LeaderRecord {
        LeaderRecord::new(id, format!("http://{id}:4001"), format!("{id}:4002"))
    }

    fn store(kv: &MemoryConsulKv, group: &str) -> ConsulStore<MemoryConsulKv> {
        ConsulStore::with_kv(group, kv.clone(), KeyScheme::consul()).expect("store")
    }

    #[tokio::test]
    async fn test_get_leader_absent() {
        let kv = MemoryConsulKv::new();
        assert_eq!(store(&kv, "rqlite").get_leader().await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_initialize_then_get() {
        let kv = MemoryConsulKv::new();
        let store = store(&kv, "rqlite");

        assert!(store.initialize_leader(&record("node1")).await.expect("initialize"));
        assert_eq!(store.get_leader().await.expect("get"), Some(record("node1")));
        let stored = kv.value("rqlite/leader").expect("stored value");
        assert_eq!(
            stored,
            br#"{"id":"node1","api_addr":"http://node1:4001","addr":"node1:4002"}"#
        );
    }

    #[tokio::test]
    async fn test_second_initialize_loses() {
        let kv = MemoryConsulKv::new();
        let first = store(&kv, "rqlite");
        let second = store(&kv, "rqlite");

        assert!(first.initialize_leader(&record("node1")).await.expect("initialize"));
        assert!(!second.initialize_leader(&record("node2")).await.expect("initialize"));
        assert_eq!(second.get_leader().await.expect("get"), Some(record("node1")));
    }

    #[tokio::test]
    async fn test_set_leader_overwrites() {
        let kv = MemoryConsulKv::new();
        let store = store(&kv, "rqlite");
        store.initialize_leader(&record("node1")).await.expect("initialize");

        store.set_leader(&record("node2")).await.expect("set");
        assert_eq!(store.get_leader().await.expect("get"), Some(record("node2")));
    }

    #[tokio::test]
    async fn test_set_leader_on_absent_key() {
        let kv = MemoryConsulKv::new();
        let store = store(&kv, "rqlite");

        store.set_leader(&record("node1")).await.expect("set");
        assert!(!store.initialize_leader(&record("node2")).await.expect("initialize"));
    }

    #[tokio::test]
    async fn test_initialize_after_delete_succeeds() {
        let kv = MemoryConsulKv::new();
        let store = store(&kv, "rqlite");
        store.initialize_leader(&record("node1")).await.expect("initialize");

        kv.delete("rqlite/leader");
        assert!(store.initialize_leader(&record("node2")).await.expect("initialize"));
        assert_eq!(store.get_leader().await.expect("get"), Some(record("node2")));
    }

    #[tokio::test]
    async fn test_corrupt_value_is_decode_error() {
        let kv = MemoryConsulKv::new();
        kv.insert("rqlite/leader", b"not a record".to_vec());

        let err = store(&kv, "rqlite").get_leader().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("rqlite/leader"));
    }

    #[tokio::test]
    async fn test_empty_value_is_decode_error() {
        let kv = MemoryConsulKv::new();
        kv.insert("rqlite/leader", Vec::new());

        let err = store(&kv, "rqlite").get_leader().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_groups_are_isolated() {
        let kv = MemoryConsulKv::new();
        assert!(store(&kv, "a").initialize_leader(&record("node1")).await.expect("initialize"));
        assert!(store(&kv, "b").initialize_leader(&record("node2")).await.expect("initialize"));
        assert_eq!(store(&kv, "a").get_leader().await.expect("get"), Some(record("node1")));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let kv = MemoryConsulKv::new();
        let store = store(&kv, "rqlite");
        kv.inject_unavailable(1);

        let err = store.initialize_leader(&record("node1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(store.initialize_leader(&record("node1")).await.expect("initialize"));
    }

    #[test]
    fn test_empty_group_rejected() {
        let err =
            ConsulStore::with_kv(" ", MemoryConsulKv::new(), KeyScheme::consul()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_custom_prefix() {
        let store = ConsulStore::with_kv("g", MemoryConsulKv::new(), KeyScheme::new("service/"))
            .expect("store");
        assert_eq!(store.leader_key().as_str(), "service/g/leader");
    }

    #[test]
    fn test_stats() {
        let store = store(&MemoryConsulKv::new(), "rqlite");
        let stats = store.stats();
        assert_eq!(stats.mode, "consul-kv");
        assert_eq!(stats.target("key"), Some(&serde_json::json!("rqlite")));
        assert_eq!(stats.target("leader_key"), Some(&serde_json::json!("rqlite/leader")));
        assert!(stats.last_error.is_none());
        assert_eq!(store.to_string(), "consul-kv");
    }

    #[test]
    fn test_http_kv_rejects_scheme_in_address() {
        let config = ConsulConfig::builder().address("http://127.0.0.1:8500").build();
        let err = HttpConsulKv::new(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_http_kv_urls() {
        let config = ConsulConfig::builder().address("consul.local:8500").datacenter("dc1").build();
        let kv = HttpConsulKv::new(&config).expect("client");
        assert_eq!(kv.address(), "consul.local:8500");
        assert_eq!(
            kv.url("rqlite/leader").expect("url").as_str(),
            "http://consul.local:8500/v1/kv/rqlite/leader"
        );
        assert_eq!(kv.params, [("dc", "dc1".to_owned())]);
    }

    #[test]
    fn test_http_kv_url_escapes_reserved_characters() {
        let kv = HttpConsulKv::new(&ConsulConfig::default()).expect("client");

        for (key, path) in [
            ("a?b/leader", "/v1/kv/a%3Fb/leader"),
            ("a?c/leader", "/v1/kv/a%3Fc/leader"),
            ("a#b/leader", "/v1/kv/a%23b/leader"),
            ("50%/leader", "/v1/kv/50%25/leader"),
        ] {
            let url = kv.url(key).expect("url");
            assert_eq!(url.path(), path, "{key}");
            assert_eq!(url.query(), None, "{key}");
            assert_eq!(url.fragment(), None, "{key}");
        }
    }

    #[test]
    fn test_http_kv_url_rejects_dot_segments() {
        let kv = HttpConsulKv::new(&ConsulConfig::default()).expect("client");
        for key in ["x/../y/leader", "./leader", "a//leader", "/rqlite/leader"] {
            assert_eq!(kv.url(key).unwrap_err().kind(), ErrorKind::Config, "{key}");
        }
    }

    #[test]
    fn test_dot_segment_group_rejected() {
        let kv = HttpConsulKv::new(&ConsulConfig::default()).expect("client");
        let err = ConsulStore::with_kv("x/../y", kv, KeyScheme::consul()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_http_kv_missing_ca_file() {
        let tls = TlsConfig::builder().ca_file("/nonexistent/ca.pem").build();
        let config = ConsulConfig::builder().scheme("https").tls(tls).build();
        let err = HttpConsulKv::new(&config).unwrap_err();
        assert!(matches!(err, DiscoError::Io { .. }));
    }

    // ========================================================================
    // HTTP client against a local agent
    // ========================================================================

    /// One request as the agent received it.
    #[derive(Debug)]
    struct Received {
        line: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Received {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        }
    }

    /// Serves one canned `(status, body)` per connection, in order, and
    /// returns every request it received.
    async fn fake_agent(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, JoinHandle<Vec<Received>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("local addr").to_string();
        let handle = tokio::spawn(async move {
            let mut received = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.expect("accept");
                received.push(read_request(&mut socket).await);
                let response = format!(
                    "HTTP/1.1 {status} Agent\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                    body.len()
                ) + body;
                socket.write_all(response.as_bytes()).await.expect("write response");
                let _ = socket.shutdown().await;
            }
            received
        });
        (address, handle)
    }

    async fn read_request(socket: &mut TcpStream) -> Received {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
            let n = socket.read(&mut chunk).await.expect("read head");
            assert!(n > 0, "connection closed before the request head");
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8(buf[..head_end].to_vec()).expect("utf-8 head");
        let mut lines = head.split("\r\n");
        let line = lines.next().unwrap_or_default().to_owned();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
            .collect();
        let len: usize = headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
            .map_or(0, |(_, value)| value.parse().expect("content-length"));

        let mut body = buf[head_end + 4..].to_vec();
        while body.len() < len {
            let n = socket.read(&mut chunk).await.expect("read body");
            assert!(n > 0, "connection closed before the request body");
            body.extend_from_slice(&chunk[..n]);
        }
        Received { line, headers, body }
    }

    fn http_kv(address: &str) -> HttpConsulKv {
        HttpConsulKv::new(&ConsulConfig::builder().address(address).build()).expect("client")
    }

    #[tokio::test]
    async fn test_http_get_absent_is_none() {
        let (address, agent) = fake_agent(vec![(404, "")]).await;

        assert_eq!(http_kv(&address).get("rqlite/leader").await.expect("get"), None);
        let received = agent.await.expect("agent");
        assert_eq!(received[0].line, "GET /v1/kv/rqlite/leader?raw HTTP/1.1");
    }

    #[tokio::test]
    async fn test_http_get_returns_raw_body() {
        let stored = r#"{"id":"node1","addr":"node1:4002"}"#;
        let (address, agent) = fake_agent(vec![(200, stored)]).await;

        let value = http_kv(&address).get("rqlite/leader").await.expect("get");
        assert_eq!(value.as_deref(), Some(stored.as_bytes()));
        agent.await.expect("agent");
    }

    #[tokio::test]
    async fn test_http_cas_maps_body_to_bool() {
        let (address, agent) = fake_agent(vec![(200, "true"), (200, "false\n")]).await;
        let kv = http_kv(&address);

        assert!(kv.cas("rqlite/leader", b"first".to_vec(), 0).await.expect("cas"));
        assert!(!kv.cas("rqlite/leader", b"second".to_vec(), 0).await.expect("cas"));

        let received = agent.await.expect("agent");
        assert_eq!(received[0].line, "PUT /v1/kv/rqlite/leader?cas=0 HTTP/1.1");
        assert_eq!(received[0].body, b"first");
        assert_eq!(received[1].body, b"second");
    }

    #[tokio::test]
    async fn test_http_put_is_unconditional() {
        let (address, agent) = fake_agent(vec![(200, "true")]).await;

        http_kv(&address).put("rqlite/leader", b"value".to_vec()).await.expect("put");
        let received = agent.await.expect("agent");
        assert_eq!(received[0].line, "PUT /v1/kv/rqlite/leader HTTP/1.1");
        assert_eq!(received[0].body, b"value");
    }

    #[tokio::test]
    async fn test_http_error_status_carries_body() {
        let (address, agent) = fake_agent(vec![(500, "rpc error: no leader")]).await;

        let err = http_kv(&address).get("rqlite/leader").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(
            matches!(
                &err,
                DiscoError::ConsulStatus { key, status: 500, body }
                    if key == "rqlite/leader" && body == "rpc error: no leader"
            ),
            "{err}"
        );
        agent.await.expect("agent");
    }

    #[tokio::test]
    async fn test_http_write_not_found_is_error() {
        let (address, agent) = fake_agent(vec![(404, ""), (404, "")]).await;
        let kv = http_kv(&address);

        let err = kv.put("rqlite/leader", b"value".to_vec()).await.unwrap_err();
        assert!(matches!(err, DiscoError::ConsulStatus { status: 404, .. }), "{err}");
        let err = kv.cas("rqlite/leader", b"value".to_vec(), 0).await.unwrap_err();
        assert!(matches!(err, DiscoError::ConsulStatus { status: 404, .. }), "{err}");
        agent.await.expect("agent");
    }

    #[tokio::test]
    async fn test_http_sends_token_auth_and_params() {
        let (address, agent) = fake_agent(vec![(404, "")]).await;
        let config = ConsulConfig::builder()
            .address(address)
            .token("secret")
            .basic_auth(BasicAuthConfig::builder().username("me").password("pw").build())
            .datacenter("dc1")
            .build();

        HttpConsulKv::new(&config).expect("client").get("rqlite/leader").await.expect("get");
        let received = agent.await.expect("agent");
        assert_eq!(received[0].line, "GET /v1/kv/rqlite/leader?raw&dc=dc1 HTTP/1.1");
        assert_eq!(received[0].header(TOKEN_HEADER), Some("secret"));
        assert_eq!(received[0].header("authorization"), Some("Basic bWU6cHc="));
    }

    #[tokio::test]
    async fn test_reserved_characters_keep_cas_condition() {
        let groups = ["a?b", "a?c", "a#b", "50%"];
        let (address, agent) = fake_agent(vec![(200, "true"); groups.len()]).await;

        for group in groups {
            let store = ConsulStore::with_kv(group, http_kv(&address), KeyScheme::consul())
                .expect("store");
            assert!(store.initialize_leader(&record("node1")).await.expect("initialize"));
        }

        let lines: Vec<String> =
            agent.await.expect("agent").into_iter().map(|r| r.line).collect();
        assert_eq!(
            lines,
            [
                "PUT /v1/kv/a%3Fb/leader?cas=0 HTTP/1.1",
                "PUT /v1/kv/a%3Fc/leader?cas=0 HTTP/1.1",
                "PUT /v1/kv/a%23b/leader?cas=0 HTTP/1.1",
                "PUT /v1/kv/50%25/leader?cas=0 HTTP/1.1",
            ]
        );
    }
}
