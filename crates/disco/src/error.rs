//! Discovery error types.
//!
//! Every error is returned to the immediate caller. Nothing here is retried,
//! logged-and-swallowed, or downgraded to a partial success.
//!
//! [`DiscoError::kind`] classifies each variant into the coarse categories a
//! bootstrap orchestrator acts on: configuration mistakes, transport
//! failures, unreadable leader records, malformed address overrides, and
//! failed name resolution.

use std::path::PathBuf;

use peerdisco_types::{CodecError, KeyError};
use snafu::{Location, Snafu};

/// Boxed error returned by pluggable name resolvers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for discovery operations.
pub type Result<T, E = DiscoError> = std::result::Result<T, E>;

/// Coarse classification of a [`DiscoError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Configuration handed to a client was invalid.
    Config,
    /// The backing store or its network transport failed.
    Transport,
    /// A stored leader record could not be decoded.
    Decode,
    /// The address override contained an entry that is not `host:port`.
    OverrideFormat,
    /// Name or service resolution failed.
    Resolution,
}

/// Discovery error types with context-rich messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DiscoError {
    /// Configuration validation error.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// A file named by the configuration could not be read.
    #[snafu(display("Failed to read {}: {source}", path.display()))]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A URL could not be built from configured or resolved parts.
    #[snafu(display("Invalid URL '{url}': {source}"))]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Parse error.
        source: url::ParseError,
    },

    /// The discovery group could not be turned into a key.
    #[snafu(display("Invalid discovery group: {source}"))]
    Key {
        /// Underlying key error.
        source: KeyError,
    },

    /// HTTP request to Consul failed before a response was received.
    #[snafu(display("Consul request failed at {location}: {source}"))]
    ConsulHttp {
        /// Underlying HTTP client error.
        source: reqwest::Error,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Consul answered with a non-success status.
    #[snafu(display("Consul returned status {status} for key '{key}': {body}"))]
    ConsulStatus {
        /// Key the request addressed.
        key: String,
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        body: String,
    },

    /// etcd request failed.
    #[snafu(display("etcd request failed at {location}: {source}"))]
    Etcd {
        /// Underlying etcd client error.
        source: etcd_client::Error,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// Leader record could not be encoded or decoded.
    #[snafu(display("Leader record at '{key}' unreadable: {source}"))]
    Codec {
        /// Key holding the record.
        key: String,
        /// Underlying codec error.
        source: CodecError,
    },

    /// An address override entry is not a valid `host:port`.
    #[snafu(display("Invalid override address '{entry}': expected host:port"))]
    InvalidOverrideAddress {
        /// The offending entry.
        entry: String,
    },

    /// Name or service resolution failed.
    #[snafu(display("Failed to resolve '{name}': {source}"))]
    Resolution {
        /// Name or SRV query that failed.
        name: String,
        /// Resolver error.
        source: BoxError,
    },
}

impl DiscoError {
    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } | Self::Io { .. } | Self::InvalidUrl { .. } | Self::Key { .. } => {
                ErrorKind::Config
            },
            Self::ConsulHttp { .. } | Self::ConsulStatus { .. } | Self::Etcd { .. } => {
                ErrorKind::Transport
            },
            Self::Codec { .. } => ErrorKind::Decode,
            Self::InvalidOverrideAddress { .. } => ErrorKind::OverrideFormat,
            Self::Resolution { .. } => ErrorKind::Resolution,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_kind() {
        let err = DiscoError::Config { message: "bad address".to_owned() };
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.to_string(), "Configuration error: bad address");
    }

    #[test]
    fn test_consul_status_is_transport() {
        let err = DiscoError::ConsulStatus {
            key: "rqlite/leader".to_owned(),
            status: 503,
            body: "no leader".to_owned(),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_etcd_error_is_transport() {
        let source = etcd_client::Error::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        let err = DiscoError::Etcd { source, location: Location::default() };
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_codec_error_is_decode() {
        let source = peerdisco_types::codec::decode(b"garbage").unwrap_err();
        let err = DiscoError::Codec { key: "/g/leader".to_owned(), source };
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("/g/leader"));
    }

    #[test]
    fn test_override_error_names_entry() {
        let err = DiscoError::InvalidOverrideAddress { entry: "5.6.7.8".to_owned() };
        assert_eq!(err.kind(), ErrorKind::OverrideFormat);
        assert!(err.to_string().contains("5.6.7.8"));
    }

    #[test]
    fn test_resolution_error_names_query() {
        let err =
            DiscoError::Resolution { name: "rqlite".to_owned(), source: "no such host".into() };
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert_eq!(err.to_string(), "Failed to resolve 'rqlite': no such host");
    }
}
