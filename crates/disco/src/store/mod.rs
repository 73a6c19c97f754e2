//! Leader stores backed by external key-value services.
//!
//! Both stores keep one [`LeaderRecord`](peerdisco_types::LeaderRecord) per
//! discovery group and rely on the service's own conditional write for the
//! at-most-one-winner guarantee of `initialize_leader`:
//!
//! - [`consul`]: check-and-set with a modify index of `0`, which succeeds only
//!   while the key does not exist.
//! - [`etcd`]: a transaction guarded by `version(key) == 0`, which succeeds only
//!   while the key has no live revision.
//!
//! The two conditions are kept as separate algorithms. They agree for a key
//! that was never written, and both allow a fresh initialize after the key is
//! deleted, but they reach that answer through different state.

pub mod consul;
pub mod etcd;

use peerdisco_types::{LeaderRecord, codec};
use snafu::ResultExt;

use crate::error::{CodecSnafu, Result};

fn encode_record(key: &str, record: &LeaderRecord) -> Result<Vec<u8>> {
    codec::encode(record).context(CodecSnafu { key })
}

fn decode_record(key: &str, bytes: &[u8]) -> Result<LeaderRecord> {
    codec::decode(bytes).context(CodecSnafu { key })
}
