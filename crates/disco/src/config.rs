//! Client configuration.
//!
//! One configuration type per backend. Every type can be built in code via
//! its builder or deserialized from JSON by the embedding service; loading
//! files and expanding environment variables is the embedder's job.
//! Missing fields take the documented defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use snafu::{ResultExt, ensure};

use crate::error::{ConfigSnafu, IoSnafu, Result};

/// Default hostname resolved by the DNS and DNS SRV clients.
pub const DEFAULT_NAME: &str = "rqlite";

/// Default port composed with DNS-resolved addresses.
pub const DEFAULT_PORT: u16 = 4001;

/// Default SRV service name.
pub const DEFAULT_SERVICE: &str = "rqlite";

/// Default environment variable holding a comma-separated `host:port` override list.
pub const DEFAULT_OVERRIDE_ENV: &str = "PEERDISCO_DNS_ADDRESSES";

/// Default Consul agent address.
pub const DEFAULT_CONSUL_ADDRESS: &str = "127.0.0.1:8500";

/// Default Consul URI scheme.
pub const DEFAULT_CONSUL_SCHEME: &str = "http";

/// Default etcd endpoint.
pub const DEFAULT_ETCD_ENDPOINT: &str = "localhost:2379";

/// Default Consul leader-key prefix.
pub const DEFAULT_CONSUL_KEY_PREFIX: &str = "";

/// Default etcd leader-key prefix.
pub const DEFAULT_ETCD_KEY_PREFIX: &str = "/";

fn default_name() -> String {
    DEFAULT_NAME.to_owned()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_service() -> String {
    DEFAULT_SERVICE.to_owned()
}

fn default_override_env() -> String {
    DEFAULT_OVERRIDE_ENV.to_owned()
}

fn default_consul_address() -> String {
    DEFAULT_CONSUL_ADDRESS.to_owned()
}

fn default_consul_scheme() -> String {
    DEFAULT_CONSUL_SCHEME.to_owned()
}

fn default_consul_key_prefix() -> String {
    DEFAULT_CONSUL_KEY_PREFIX.to_owned()
}

fn default_etcd_endpoints() -> Vec<String> {
    vec![DEFAULT_ETCD_ENDPOINT.to_owned()]
}

fn default_etcd_key_prefix() -> String {
    DEFAULT_ETCD_KEY_PREFIX.to_owned()
}

/// Configuration for plain-name DNS discovery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, bon::Builder)]
#[builder(derive(Debug))]
pub struct DnsConfig {
    /// Hostname to resolve for node addresses.
    #[serde(default = "default_name")]
    #[builder(into, default = default_name())]
    name: String,

    /// Port the resolved nodes listen on.
    #[serde(default = "default_port")]
    #[builder(default = DEFAULT_PORT)]
    port: u16,

    /// Environment variable consulted for an address override.
    /// An empty string disables the override.
    #[serde(default = "default_override_env")]
    #[builder(into, default = default_override_env())]
    override_env: String,
}

impl DnsConfig {
    /// Returns the hostname to resolve.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the port composed with each resolved address.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the override environment variable, if enabled.
    #[must_use]
    pub fn override_env(&self) -> Option<&str> {
        if self.override_env.is_empty() { None } else { Some(&self.override_env) }
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for DNS SRV discovery.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, bon::Builder)]
#[builder(derive(Debug))]
pub struct SrvConfig {
    /// Domain name queried for SRV records.
    #[serde(default = "default_name")]
    #[builder(into, default = default_name())]
    name: String,

    /// Service requested in the SRV query.
    #[serde(default = "default_service")]
    #[builder(into, default = default_service())]
    service: String,
}

impl SrvConfig {
    /// Returns the domain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the fully qualified SRV query name, e.g. `_rqlite._tcp.rqlite.`.
    #[must_use]
    pub fn dns_name(&self) -> String {
        format!("_{}._tcp.{}.", self.service, self.name)
    }
}

impl Default for SrvConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// HTTP basic-auth credentials for Consul.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, bon::Builder)]
pub struct BasicAuthConfig {
    /// Username.
    #[serde(default)]
    #[builder(into)]
    pub username: String,
    /// Password.
    #[serde(default)]
    #[builder(into)]
    pub password: String,
}

/// TLS material for talking to a backing store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, bon::Builder)]
pub struct TlsConfig {
    /// PEM file with the CA certificate(s) to trust.
    #[serde(default)]
    #[builder(into)]
    pub ca_file: Option<PathBuf>,

    /// Directory whose files are all PEM CA certificates to trust.
    #[serde(default)]
    #[builder(into)]
    pub ca_path: Option<PathBuf>,

    /// PEM file with the client certificate. Requires `key_file`.
    #[serde(default)]
    #[builder(into)]
    pub cert_file: Option<PathBuf>,

    /// PEM file with the client private key. Requires `cert_file`.
    #[serde(default)]
    #[builder(into)]
    pub key_file: Option<PathBuf>,

    /// Server name to verify against, if it differs from the endpoint host.
    #[serde(default, alias = "address")]
    #[builder(into)]
    pub domain: Option<String>,

    /// Disable certificate verification. Consul only.
    #[serde(default)]
    #[builder(default)]
    pub insecure_skip_verify: bool,

    // Inline PEM fields are rejected by `validate`.
    #[serde(default)]
    #[builder(skip)]
    ca_pem: Option<String>,
    #[serde(default)]
    #[builder(skip)]
    cert_pem: Option<String>,
    #[serde(default)]
    #[builder(skip)]
    key_pem: Option<String>,
}

impl TlsConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.cert_file.is_some() == self.key_file.is_some(),
            ConfigSnafu { message: "tls cert_file and key_file must be set together" }
        );
        ensure!(
            self.ca_pem.is_none() && self.cert_pem.is_none() && self.key_pem.is_none(),
            ConfigSnafu {
                message: "inline tls ca_pem, cert_pem and key_pem are not supported; \
                          use ca_file, cert_file and key_file"
            }
        );
        Ok(())
    }

    /// Reads every configured CA certificate: `ca_file` first, then the
    /// files in `ca_path` in name order.
    pub(crate) fn read_ca_certificates(&self) -> Result<Vec<Vec<u8>>> {
        let mut certs = Vec::new();
        if let Some(ca_file) = &self.ca_file {
            certs.push(read_file(ca_file)?);
        }
        if let Some(dir) = &self.ca_path {
            let mut paths = Vec::new();
            for entry in std::fs::read_dir(dir).context(IoSnafu { path: dir })? {
                let path = entry.context(IoSnafu { path: dir })?.path();
                if path.is_file() {
                    paths.push(path);
                }
            }
            paths.sort();
            for path in &paths {
                certs.push(read_file(path)?);
            }
        }
        Ok(certs)
    }
}

/// Configuration for the Consul leader store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, bon::Builder)]
#[builder(derive(Debug))]
pub struct ConsulConfig {
    /// Consul agent address as bare `host:port`, without scheme.
    #[serde(default = "default_consul_address")]
    #[builder(into, default = default_consul_address())]
    address: String,

    /// URI scheme, `http` or `https`.
    #[serde(default = "default_consul_scheme")]
    #[builder(into, default = default_consul_scheme())]
    scheme: String,

    /// Datacenter to address; the agent's own when unset.
    #[serde(default)]
    #[builder(into)]
    datacenter: Option<String>,

    /// HTTP basic-auth credentials.
    #[serde(default)]
    basic_auth: Option<BasicAuthConfig>,

    /// ACL token sent with every request.
    #[serde(default)]
    #[builder(into)]
    token: Option<String>,

    /// File containing the ACL token, read once at construction.
    #[serde(default)]
    #[builder(into)]
    token_file: Option<PathBuf>,

    /// Enterprise namespace.
    #[serde(default)]
    #[builder(into)]
    namespace: Option<String>,

    /// Enterprise admin partition.
    #[serde(default)]
    #[builder(into)]
    partition: Option<String>,

    /// TLS material. Requires scheme `https`.
    #[serde(default, alias = "tls_config")]
    tls: Option<TlsConfig>,

    /// Prefix placed before `{group}/leader`.
    #[serde(default = "default_consul_key_prefix")]
    #[builder(into, default = default_consul_key_prefix())]
    key_prefix: String,
}

impl ConsulConfig {
    /// Returns the agent address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the URI scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Returns the datacenter.
    #[must_use]
    pub fn datacenter(&self) -> Option<&str> {
        self.datacenter.as_deref()
    }

    /// Returns the basic-auth credentials.
    #[must_use]
    pub fn basic_auth(&self) -> Option<&BasicAuthConfig> {
        self.basic_auth.as_ref()
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns the admin partition.
    #[must_use]
    pub fn partition(&self) -> Option<&str> {
        self.partition.as_deref()
    }

    /// Returns the TLS configuration.
    #[must_use]
    pub fn tls(&self) -> Option<&TlsConfig> {
        self.tls.as_ref()
    }

    /// Returns the leader-key prefix.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Resolves the ACL token: the inline token wins over `token_file`.
    ///
    /// # Errors
    ///
    /// Returns `DiscoError::Io` if the token file cannot be read.
    pub fn resolve_token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        match &self.token_file {
            Some(path) => Ok(Some(read_to_string(path)?.trim().to_owned())),
            None => Ok(None),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `DiscoError::Config` if the address carries a scheme, the
    /// scheme is neither `http` nor `https`, the key prefix starts with `/`,
    /// or the TLS settings are incomplete or set without scheme `https`.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.address.starts_with("http"),
            ConfigSnafu { message: "address should not contain HTTP or HTTPS" }
        );
        ensure!(!self.address.is_empty(), ConfigSnafu { message: "address must not be empty" });
        ensure!(
            matches!(self.scheme.as_str(), "http" | "https"),
            ConfigSnafu { message: format!("unsupported scheme '{}'", self.scheme) }
        );
        ensure!(
            !self.key_prefix.starts_with('/'),
            ConfigSnafu { message: "consul key_prefix must not start with '/'" }
        );
        if let Some(tls) = &self.tls {
            tls.validate()?;
            ensure!(
                self.scheme == "https",
                ConfigSnafu { message: "consul tls settings require scheme 'https'" }
            );
        }
        Ok(())
    }
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for the etcd leader store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, bon::Builder)]
#[builder(derive(Debug))]
pub struct EtcdConfig {
    /// etcd endpoints.
    #[serde(default = "default_etcd_endpoints")]
    #[builder(default = default_etcd_endpoints())]
    endpoints: Vec<String>,

    /// Username for etcd authentication. Requires `password`.
    #[serde(default)]
    #[builder(into)]
    username: Option<String>,

    /// Password for etcd authentication.
    #[serde(default)]
    #[builder(into)]
    password: Option<String>,

    /// Connection timeout in milliseconds; the transport default when unset.
    #[serde(default)]
    connect_timeout_ms: Option<u64>,

    /// TLS material.
    #[serde(default)]
    tls: Option<TlsConfig>,

    /// Prefix placed before `{group}/leader`.
    #[serde(default = "default_etcd_key_prefix")]
    #[builder(into, default = default_etcd_key_prefix())]
    key_prefix: String,
}

impl EtcdConfig {
    /// Returns the endpoints.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Returns the username and password, if authentication is configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }

    /// Returns the connection timeout in milliseconds.
    #[must_use]
    pub fn connect_timeout_ms(&self) -> Option<u64> {
        self.connect_timeout_ms
    }

    /// Returns the TLS configuration.
    #[must_use]
    pub fn tls(&self) -> Option<&TlsConfig> {
        self.tls.as_ref()
    }

    /// Returns the leader-key prefix.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `DiscoError::Config` if no endpoints are configured, a
    /// username is set without a password, or the TLS settings are
    /// incomplete or ask to skip verification.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.endpoints.is_empty(),
            ConfigSnafu { message: "at least one etcd endpoint is required" }
        );
        ensure!(
            self.username.is_some() == self.password.is_some(),
            ConfigSnafu { message: "etcd username and password must be set together" }
        );
        if let Some(tls) = &self.tls {
            tls.validate()?;
            ensure!(
                !tls.insecure_skip_verify,
                ConfigSnafu { message: "etcd does not support insecure_skip_verify" }
            );
        }
        Ok(())
    }
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Reads a file named by the configuration.
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).context(IoSnafu { path })
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).context(IoSnafu { path })
}
