//! Cached result of a resolver's most recent lookup.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use peerdisco_types::ClientStats;

use crate::error::{DiscoError, Result};

#[derive(Debug, Default)]
struct Snapshot {
    last_contact: Option<DateTime<Utc>>,
    last_addresses: Vec<String>,
    last_error: Option<String>,
}

/// Last-lookup bookkeeping for one resolver instance.
///
/// Each update happens under a single lock acquisition, so a concurrent
/// [`fill_stats`](Self::fill_stats) sees either the old or the new snapshot.
/// A failure records the error but keeps the previous successful addresses.
#[derive(Debug, Default)]
pub(crate) struct LookupState {
    inner: Mutex<Snapshot>,
}

impl LookupState {
    /// Records the outcome of a lookup and passes it through.
    pub(crate) fn observe(&self, result: Result<Vec<String>>) -> Result<Vec<String>> {
        match &result {
            Ok(addrs) => self.record_success(addrs),
            Err(e) => self.record_failure(e),
        }
        result
    }

    fn record_success(&self, addrs: &[String]) {
        let mut snapshot = self.inner.lock();
        snapshot.last_contact = Some(Utc::now());
        snapshot.last_addresses = addrs.to_vec();
        snapshot.last_error = None;
    }

    fn record_failure(&self, err: &DiscoError) {
        self.inner.lock().last_error = Some(err.to_string());
    }

    /// Copies the cached lookup fields into `stats`.
    pub(crate) fn fill_stats(&self, mut stats: ClientStats) -> ClientStats {
        let snapshot = self.inner.lock();
        stats.last_error = snapshot.last_error.clone();
        if let Some(contact) = snapshot.last_contact {
            stats.last_contact = Some(contact);
            stats.last_addresses = Some(snapshot.last_addresses.clone());
        }
        stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn failure() -> DiscoError {
        DiscoError::Resolution { name: "rqlite".to_owned(), source: "no such host".into() }
    }

    #[test]
    fn test_fresh_state_reports_nothing() {
        let stats = LookupState::default().fill_stats(ClientStats::new("dns"));
        assert!(stats.last_error.is_none());
        assert!(stats.last_contact.is_none());
        assert!(stats.last_addresses.is_none());
    }

    #[test]
    fn test_success_records_addresses() {
        let state = LookupState::default();
        let addrs = state.observe(Ok(vec!["1.2.3.4:4001".to_owned()])).expect("lookup");
        assert_eq!(addrs, ["1.2.3.4:4001"]);

        let stats = state.fill_stats(ClientStats::new("dns"));
        assert!(stats.last_contact.is_some());
        assert_eq!(stats.last_addresses, Some(vec!["1.2.3.4:4001".to_owned()]));
    }

    #[test]
    fn test_empty_success_is_still_a_contact() {
        let state = LookupState::default();
        state.observe(Ok(vec![])).expect("lookup");

        let stats = state.fill_stats(ClientStats::new("dns"));
        assert!(stats.last_contact.is_some());
        assert_eq!(stats.last_addresses, Some(vec![]));
    }

    #[test]
    fn test_failure_preserves_previous_addresses() {
        let state = LookupState::default();
        state.observe(Ok(vec!["1.2.3.4:4001".to_owned()])).expect("lookup");
        let before = state.fill_stats(ClientStats::new("dns")).last_contact;

        assert!(state.observe(Err(failure())).is_err());

        let stats = state.fill_stats(ClientStats::new("dns"));
        assert_eq!(stats.last_addresses, Some(vec!["1.2.3.4:4001".to_owned()]));
        assert_eq!(stats.last_contact, before);
        assert!(stats.last_error.expect("error recorded").contains("no such host"));
    }

    #[test]
    fn test_success_clears_previous_error() {
        let state = LookupState::default();
        assert!(state.observe(Err(failure())).is_err());
        state.observe(Ok(vec!["1.2.3.4:4001".to_owned()])).expect("lookup");

        assert!(state.fill_stats(ClientStats::new("dns")).last_error.is_none());
    }
}
