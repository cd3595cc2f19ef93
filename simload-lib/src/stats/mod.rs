//! Windowed per-client statistics.
//!
//! Completions are folded into the current window of their client by the
//! [`StatsAggregator`]. An independent monitor per client cuts that window
//! every `monitor_interval`, and the resulting [`StatsSnapshot`]s are
//! pushed to a [`Reporter`] and kept on a [`SnapshotBoard`].

use std::{sync::Arc, time::Duration};

use crate::profile::ClientId;

mod aggregator;
mod monitor;
mod reporter;
mod window;

pub use self::{
    aggregator::StatsAggregator,
    reporter::{Reporter, SnapshotBoard},
};

pub(crate) use self::monitor::{monitor_client, report_worker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Timeout,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

#[derive(Debug, Clone)]
/// One finished request, consumed by the aggregator.
pub struct RequestRecord {
    pub client_id: ClientId,
    /// Index of the issuing instance within its client.
    pub instance: usize,
    /// Run-relative issuance time.
    pub issued_at: Duration,
    /// Run-relative completion time.
    pub completed_at: Duration,
    pub request_mb: f64,
    pub response_mb: f64,
    pub outcome: Outcome,
}

impl RequestRecord {
    pub fn latency(&self) -> Duration {
        self.completed_at.saturating_sub(self.issued_at)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencySummary {
    pub mean: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
    pub max: Duration,
}

#[derive(Debug, Clone)]
/// Statistics of one client over one monitor window.
///
/// Windows of a client never overlap, and every recorded request
/// is part of exactly one emitted snapshot.
pub struct StatsSnapshot {
    pub client_id: ClientId,
    pub client_name: Arc<str>,
    pub window_start: Duration,
    pub window_end: Duration,
    /// Completed requests, successful or not.
    pub requests: u64,
    pub successes: u64,
    /// Failed requests, timeouts included.
    pub failures: u64,
    pub timeouts: u64,
    pub request_mb: f64,
    pub response_mb: f64,
    pub latency: LatencySummary,
}

impl StatsSnapshot {
    /// Bytes transferred (request + response), in MB.
    pub fn transfer_mb(&self) -> f64 {
        self.request_mb + self.response_mb
    }

    pub fn window(&self) -> Duration {
        self.window_end.saturating_sub(self.window_start)
    }

    /// Completed requests per second over the window.
    pub fn throughput(&self) -> f64 {
        let secs = self.window().as_secs_f64();
        if secs == 0. {
            0.
        } else {
            self.requests as f64 / secs
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Cumulative counters of one client over the whole run.
pub struct ClientTotals {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub transfer_mb: f64,
    pub max_latency: Duration,
    /// Snapshots emitted for this client.
    pub windows: u64,
}
