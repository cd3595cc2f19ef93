use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use super::StatsSnapshot;
use crate::{engine::RunReport, profile::ClientId};

/// Push interface for statistics: receives every emitted snapshot in order.
pub trait Reporter: Send + 'static {
    fn on_snapshot(&mut self, snapshot: &StatsSnapshot);

    /// Called once, when the run is over and the final windows are flushed.
    fn finish(&mut self, _report: &RunReport) {}
}

impl<R: Reporter + ?Sized> Reporter for Box<R> {
    fn on_snapshot(&mut self, snapshot: &StatsSnapshot) {
        (**self).on_snapshot(snapshot)
    }

    fn finish(&mut self, report: &RunReport) {
        (**self).finish(report)
    }
}

#[derive(Debug, Clone, Default)]
/// Pull interface for statistics: latest snapshot per client
/// and the full history of the run.
pub struct SnapshotBoard {
    inner: Arc<RwLock<BoardState>>,
}

#[derive(Debug, Default)]
struct BoardState {
    latest: HashMap<ClientId, StatsSnapshot>,
    history: Vec<StatsSnapshot>,
}

impl SnapshotBoard {
    pub(crate) fn push(&self, snapshot: StatsSnapshot) {
        let mut state = self.inner.write();
        state.latest.insert(snapshot.client_id, snapshot.clone());
        state.history.push(snapshot);
    }

    pub fn latest(&self, client_id: ClientId) -> Option<StatsSnapshot> {
        self.inner.read().latest.get(&client_id).cloned()
    }

    /// All snapshots emitted so far, in emission order.
    pub fn history(&self) -> Vec<StatsSnapshot> {
        self.inner.read().history.clone()
    }

    pub fn history_for(&self, client_id: ClientId) -> Vec<StatsSnapshot> {
        self.inner
            .read()
            .history
            .iter()
            .filter(|snapshot| snapshot.client_id == client_id)
            .cloned()
            .collect()
    }
}
