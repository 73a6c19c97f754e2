//! Core types for peerdisco.
//!
//! This crate provides the values shared by every discovery backend:
//! - [`LeaderRecord`], the payload identifying the bootstrap leader
//! - The record codec ([`codec::encode`] / [`codec::decode`])
//! - Leader key derivation from a discovery group ([`KeyScheme`])
//! - The [`ClientStats`] diagnostics snapshot

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod key;
pub mod record;
pub mod stats;

// Re-export commonly used types at crate root
pub use codec::CodecError;
pub use key::{KeyError, KeyScheme, LeaderKey};
pub use record::LeaderRecord;
pub use stats::ClientStats;
