//! Fuzz target for address override parsing.
//!
//! Any string must either be rejected or split into a non-empty host and a
//! port, and accepted override lists must contain only valid entries.

#![no_main]

use libfuzzer_sys::fuzz_target;
use peerdisco::resolver::{
    dns::parse_override,
    hostport::{is_host_port, join_host_port, split_host_port},
};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Some((host, port)) = split_host_port(input) {
        assert!(!host.is_empty());
        let joined = join_host_port(host, port);
        assert_eq!(split_host_port(&joined), Some((host, port)));
    }

    if let Ok(addrs) = parse_override(input) {
        assert!(addrs.iter().all(|addr| is_host_port(addr)));
    }
});
