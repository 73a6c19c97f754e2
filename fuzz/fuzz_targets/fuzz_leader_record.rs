//! Fuzz target for the leader record codec.
//!
//! Arbitrary bytes read back from a store must never panic the decoder, and
//! every record that decodes must survive an encode/decode cycle unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;
use peerdisco_types::codec::{decode, encode};

fuzz_target!(|data: &[u8]| {
    let Ok(record) = decode(data) else {
        return;
    };
    let bytes = encode(&record).expect("decoded record must re-encode");
    let again = decode(&bytes).expect("re-encoded record must decode");
    assert_eq!(record, again, "roundtrip mismatch");
});
