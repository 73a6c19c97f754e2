//! Shared test utilities for peerdisco crates.
//!
//! - [`unique_group`] - Discovery group names that never collide
//! - [`race_initialize`] - Concurrent `initialize_leader` contenders
//! - [`LiveBackends`] - Opt-in live Consul and etcd endpoints
//! - [`strategies`] - Proptest generators for leader records

#![deny(unsafe_code)]

mod group;
pub use group::unique_group;

mod race;
pub use race::{RaceOutcome, contender_record, race_initialize, winners};

mod live;
pub use live::{CONSUL_ADDRESS_ENV, ETCD_ENDPOINTS_ENV, LiveBackends};

pub mod strategies;
