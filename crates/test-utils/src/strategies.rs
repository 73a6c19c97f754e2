//! Proptest strategies for peerdisco domain types.
//!
//! # Usage
//!
//! ```no_run
//! use peerdisco_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(record in strategies::arb_leader_record()) {
//!         // test invariant with randomly generated record
//!     }
//! }
//! ```

use peerdisco_types::LeaderRecord;
use proptest::prelude::*;

/// Generates a node identifier, sometimes empty.
pub fn arb_node_id() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-z][a-z0-9-]{0,15}", any::<String>()]
}

/// Generates a `host:port` address, sometimes empty.
pub fn arb_addr() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (any::<[u8; 4]>(), any::<u16>())
            .prop_map(|([a, b, c, d], port)| format!("{a}.{b}.{c}.{d}:{port}")),
        ("[a-z]{1,12}(\\.[a-z]{1,8}){0,2}", any::<u16>())
            .prop_map(|(host, port)| format!("{host}:{port}")),
    ]
}

/// Generates an API URL, sometimes empty.
pub fn arb_api_addr() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        (prop_oneof![Just("http"), Just("https")], arb_addr())
            .prop_map(|(scheme, addr)| format!("{scheme}://{addr}")),
        any::<String>(),
    ]
}

/// Generates an arbitrary leader record, including ones with empty fields.
pub fn arb_leader_record() -> impl Strategy<Value = LeaderRecord> {
    (arb_node_id(), arb_api_addr(), arb_addr())
        .prop_map(|(id, api_addr, addr)| LeaderRecord::new(id, api_addr, addr))
}
