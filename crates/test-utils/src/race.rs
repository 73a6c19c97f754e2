//! Concurrent `initialize_leader` driver.

use std::sync::Arc;

use peerdisco::{DiscoError, LeaderRecord, LeaderStore};
use tokio::sync::Barrier;

/// Result of one contender in [`race_initialize`].
#[derive(Debug)]
pub struct RaceOutcome {
    /// Record this contender tried to write.
    pub record: LeaderRecord,
    /// What `initialize_leader` returned.
    pub result: Result<bool, DiscoError>,
}

impl RaceOutcome {
    /// Returns true if this contender's write was applied.
    pub fn won(&self) -> bool {
        matches!(self.result, Ok(true))
    }
}

/// Returns the record written by contender `index`.
pub fn contender_record(index: usize) -> LeaderRecord {
    LeaderRecord::new(
        format!("node-{index}"),
        format!("http://node-{index}.local:4001"),
        format!("node-{index}.local:4002"),
    )
}

/// Calls `initialize_leader` on every store at once, one task per store.
///
/// Store `i` writes [`contender_record(i)`](contender_record). All tasks wait
/// on a barrier before issuing their write. Outcomes are returned in store
/// order.
///
/// # Panics
///
/// Re-raises a panic from any contender task.
pub async fn race_initialize<S>(stores: Vec<Arc<S>>) -> Vec<RaceOutcome>
where
    S: LeaderStore + ?Sized + 'static,
{
    let barrier = Arc::new(Barrier::new(stores.len()));
    let handles: Vec<_> = stores
        .into_iter()
        .enumerate()
        .map(|(index, store)| {
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                let record = contender_record(index);
                barrier.wait().await;
                let result = store.initialize_leader(&record).await;
                RaceOutcome { record, result }
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
    outcomes
}

/// Returns the records of every contender that won.
pub fn winners(outcomes: &[RaceOutcome]) -> Vec<&LeaderRecord> {
    outcomes.iter().filter(|o| o.won()).map(|o| &o.record).collect()
}
