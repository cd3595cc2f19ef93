use std::{sync::Arc, time::Duration};

use hdrhistogram::Histogram;

use super::{LatencySummary, Outcome, RequestRecord, StatsSnapshot};
use crate::profile::ClientId;

/// Counters of the window in progress for one client.
pub(super) struct Window {
    start: Duration,
    requests: u64,
    successes: u64,
    failures: u64,
    timeouts: u64,
    request_mb: f64,
    response_mb: f64,
    latency_sum: Duration,
    latency_max: Duration,
    /// latency in microseconds
    histogram: Histogram<u64>,
}

impl Window {
    pub(super) fn new(start: Duration, template: &Histogram<u64>) -> Self {
        Self {
            start,
            requests: 0,
            successes: 0,
            failures: 0,
            timeouts: 0,
            request_mb: 0.,
            response_mb: 0.,
            latency_sum: Duration::ZERO,
            latency_max: Duration::ZERO,
            histogram: Histogram::new_from(template),
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.requests == 0
    }

    pub(super) fn fold(&mut self, record: &RequestRecord) {
        self.requests += 1;
        match record.outcome {
            Outcome::Success => self.successes += 1,
            Outcome::Failure => self.failures += 1,
            Outcome::Timeout => {
                self.failures += 1;
                self.timeouts += 1;
            }
        }
        self.request_mb += record.request_mb;
        self.response_mb += record.response_mb;

        let latency = record.latency();
        self.latency_sum += latency;
        self.latency_max = self.latency_max.max(latency);
        self.histogram
            .saturating_record(u64::try_from(latency.as_micros()).unwrap_or(u64::MAX));
    }

    pub(super) fn into_snapshot(
        self,
        client_id: ClientId,
        client_name: Arc<str>,
        end: Duration,
    ) -> StatsSnapshot {
        let latency = if self.requests == 0 {
            LatencySummary::default()
        } else {
            let quantile = |q: f64| {
                Duration::from_micros(self.histogram.value_at_quantile(q))
                    .min(self.latency_max)
            };
            LatencySummary {
                mean: Duration::from_secs_f64(
                    self.latency_sum.as_secs_f64() / self.requests as f64,
                ),
                p50: quantile(0.5),
                p90: quantile(0.9),
                p99: quantile(0.99),
                max: self.latency_max,
            }
        };

        StatsSnapshot {
            client_id,
            client_name,
            window_start: self.start,
            window_end: end.max(self.start),
            requests: self.requests,
            successes: self.successes,
            failures: self.failures,
            timeouts: self.timeouts,
            request_mb: self.request_mb,
            response_mb: self.response_mb,
            latency,
        }
    }
}
