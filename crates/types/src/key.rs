//! Leader key derivation.
//!
//! A discovery group maps to exactly one leader key: `"{prefix}{group}/leader"`.
//! The prefix is a per-backend setting. Consul rejects keys with a leading
//! slash while etcd deployments conventionally use one, so each backend has
//! its own default scheme.
//!
//! A group may contain `/`, but every segment between slashes must be
//! non-empty and must not be `.` or `..`. HTTP backends normalize such
//! segments away, which would map distinct groups onto one key.

use std::fmt;

use snafu::{Snafu, ensure};

/// Path segment appended to every group.
pub const LEADER_SUFFIX: &str = "leader";

/// Error type for key derivation.
#[derive(Debug, Snafu)]
pub enum KeyError {
    /// The discovery group was empty or whitespace.
    #[snafu(display("discovery group must not be empty"))]
    EmptyGroup,

    /// A `/`-separated segment of the group is empty, `.` or `..`.
    #[snafu(display("discovery group '{group}' has invalid path segment '{segment}'"))]
    InvalidSegment {
        /// The rejected group.
        group: String,
        /// The offending segment.
        segment: String,
    },
}

/// Returns the first segment of `group` that a URL path would not keep as-is.
fn invalid_segment(group: &str) -> Option<&str> {
    group.split('/').find(|segment| matches!(*segment, "" | "." | ".."))
}

/// How a backend lays out leader keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyScheme {
    prefix: String,
}

impl KeyScheme {
    /// Creates a scheme that places every leader key under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Default scheme for Consul: no prefix.
    #[must_use]
    pub fn consul() -> Self {
        Self::new("")
    }

    /// Default scheme for etcd: rooted at `/`.
    #[must_use]
    pub fn etcd() -> Self {
        Self::new("/")
    }

    /// Returns the key prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Derives the leader key for a discovery group.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::EmptyGroup` if `group` is empty or whitespace, or
    /// `KeyError::InvalidSegment` if one of its segments is empty, `.` or `..`.
    pub fn leader_key(&self, group: &str) -> Result<LeaderKey, KeyError> {
        ensure!(!group.trim().is_empty(), EmptyGroupSnafu);
        if let Some(segment) = invalid_segment(group) {
            return InvalidSegmentSnafu { group, segment }.fail();
        }
        Ok(LeaderKey {
            group: group.to_owned(),
            path: format!("{}{}/{}", self.prefix, group, LEADER_SUFFIX),
        })
    }
}

/// A discovery group together with its derived leader key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaderKey {
    group: String,
    path: String,
}

impl LeaderKey {
    /// Returns the discovery group this key was derived from.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Returns the full key path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl AsRef<str> for LeaderKey {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for LeaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
