use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use rama::{
    error::{ErrorContext as _, OpaqueError},
    telemetry::tracing,
};

use super::{ClientTotals, Outcome, RequestRecord, StatsSnapshot, window::Window};
use crate::{
    clock::SimClock,
    profile::{ClientId, ClientProfile},
};

/// Highest latency tracked by the histograms, in microseconds (1 hour).
const MAX_TRACKED_LATENCY_US: u64 = 3_600_000_000;

/// Task-safe accumulation of request records, keyed by client.
///
/// All mutation happens under a single lock,
/// so a window cut always observes a consistent set of counters.
/// Raw records are folded in and never retained.
pub struct StatsAggregator {
    clock: SimClock,
    template: Histogram<u64>,
    state: Mutex<AggregatorState>,
}

struct AggregatorState {
    clients: HashMap<ClientId, ClientStats>,
    closed: bool,
}

struct ClientStats {
    name: Arc<str>,
    window: Window,
    totals: ClientTotals,
}

impl StatsAggregator {
    pub fn try_new(clock: SimClock, profiles: &[Arc<ClientProfile>]) -> Result<Self, OpaqueError> {
        let template = Histogram::new_with_bounds(1, MAX_TRACKED_LATENCY_US, 3)
            .context("create latency histogram")?;

        let now = clock.now();
        let clients = profiles
            .iter()
            .map(|profile| {
                (
                    profile.client_id,
                    ClientStats {
                        name: Arc::from(profile.client_name.as_str()),
                        window: Window::new(now, &template),
                        totals: ClientTotals::default(),
                    },
                )
            })
            .collect();

        Ok(Self {
            clock,
            template,
            state: Mutex::new(AggregatorState {
                clients,
                closed: false,
            }),
        })
    }

    /// Fold a record into the current window of its client.
    ///
    /// Returns `false` if the record was discarded,
    /// because the aggregator is closed or the client unknown.
    pub fn record(&self, record: RequestRecord) -> bool {
        let mut state = self.state.lock();
        Self::fold(&mut state, &record)
    }

    /// Like [`Self::record`], but `completed_at` is raised to the clock
    /// reading taken under the lock, so the record always falls inside
    /// the window it is counted in.
    pub fn record_completed(&self, mut record: RequestRecord) -> bool {
        let mut state = self.state.lock();
        record.completed_at = record.completed_at.max(self.clock.now());
        Self::fold(&mut state, &record)
    }

    /// Cut the current window of a client and start the next one.
    ///
    /// Returns a snapshot only if the window saw activity.
    pub fn take_window(&self, client_id: ClientId) -> Option<StatsSnapshot> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        let client = state.clients.get_mut(&client_id)?;
        Self::cut(client_id, client, now, &self.template)
    }

    /// Cut the windows of all clients for the last time
    /// and close the aggregator: records arriving later are discarded.
    pub fn flush_all(&self) -> Vec<StatsSnapshot> {
        let mut state = self.state.lock();
        let now = self.clock.now();
        state.closed = true;

        let mut snapshots: Vec<_> = state
            .clients
            .iter_mut()
            .filter_map(|(client_id, client)| Self::cut(*client_id, client, now, &self.template))
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.client_id);
        snapshots
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Cumulative counters of every client.
    pub fn totals(&self) -> BTreeMap<ClientId, ClientTotals> {
        self.state
            .lock()
            .clients
            .iter()
            .map(|(client_id, client)| (*client_id, client.totals.clone()))
            .collect()
    }

    fn fold(state: &mut AggregatorState, record: &RequestRecord) -> bool {
        if state.closed {
            tracing::trace!(client_id = %record.client_id, "discard record: aggregator closed");
            return false;
        }

        let Some(client) = state.clients.get_mut(&record.client_id) else {
            tracing::debug!(client_id = %record.client_id, "discard record: unknown client");
            return false;
        };

        client.window.fold(record);

        let totals = &mut client.totals;
        totals.requests += 1;
        match record.outcome {
            Outcome::Success => totals.successes += 1,
            Outcome::Failure => totals.failures += 1,
            Outcome::Timeout => {
                totals.failures += 1;
                totals.timeouts += 1;
            }
        }
        totals.transfer_mb += record.request_mb + record.response_mb;
        totals.max_latency = totals.max_latency.max(record.latency());

        true
    }

    fn cut(
        client_id: ClientId,
        client: &mut ClientStats,
        now: std::time::Duration,
        template: &Histogram<u64>,
    ) -> Option<StatsSnapshot> {
        let window = std::mem::replace(&mut client.window, Window::new(now, template));
        if window.is_empty() {
            return None;
        }
        client.totals.windows += 1;
        Some(window.into_snapshot(client_id, client.name.clone(), now))
    }
}
