use hbase_simload_lib::{
    engine::RunReport,
    stats::{Reporter, StatsSnapshot},
};

use super::ms;

#[derive(Debug, Default)]
pub struct JsonlReporter;

impl JsonlReporter {
    pub fn new() -> Self {
        Self
    }

    fn snapshot_line(snapshot: &StatsSnapshot) -> serde_json::Value {
        serde_json::json!({
            "type": "snapshot",
            "client_id": snapshot.client_id,
            "client_name": &*snapshot.client_name,
            "window_start_ms": snapshot.window_start.as_millis(),
            "window_end_ms": snapshot.window_end.as_millis(),
            "requests": snapshot.requests,
            "successes": snapshot.successes,
            "failures": snapshot.failures,
            "timeouts": snapshot.timeouts,
            "rps": snapshot.throughput(),
            "request_mb": snapshot.request_mb,
            "response_mb": snapshot.response_mb,
            "latency_ms": {
                "mean": ms(snapshot.latency.mean),
                "p50": ms(snapshot.latency.p50),
                "p90": ms(snapshot.latency.p90),
                "p99": ms(snapshot.latency.p99),
                "max": ms(snapshot.latency.max),
            },
        })
    }

    fn final_line(report: &RunReport) -> serde_json::Value {
        let clients: Vec<_> = report
            .totals
            .iter()
            .map(|(client_id, totals)| {
                serde_json::json!({
                    "client_id": client_id,
                    "requests": totals.requests,
                    "successes": totals.successes,
                    "failures": totals.failures,
                    "timeouts": totals.timeouts,
                    "transfer_mb": totals.transfer_mb,
                    "max_latency_ms": ms(totals.max_latency),
                    "windows": totals.windows,
                })
            })
            .collect();

        serde_json::json!({
            "type": "final",
            "elapsed_ms": report.elapsed.as_millis(),
            "clean_shutdown": report.clean_shutdown,
            "clients": clients,
        })
    }
}

impl Reporter for JsonlReporter {
    fn on_snapshot(&mut self, snapshot: &StatsSnapshot) {
        println!("{}", Self::snapshot_line(snapshot));
    }

    fn finish(&mut self, report: &RunReport) {
        println!("{}", Self::final_line(report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{collections::BTreeMap, sync::Arc, time::Duration};

    use hbase_simload_lib::{
        profile::ClientId,
        stats::{ClientTotals, LatencySummary},
    };

    fn snapshot() -> StatsSnapshot {
        StatsSnapshot {
            client_id: ClientId(3),
            client_name: Arc::from("scan"),
            window_start: Duration::from_secs(1),
            window_end: Duration::from_secs(2),
            requests: 40,
            successes: 38,
            failures: 2,
            timeouts: 1,
            request_mb: 0.04,
            response_mb: 20.,
            latency: LatencySummary {
                mean: Duration::from_millis(12),
                p50: Duration::from_millis(10),
                p90: Duration::from_millis(20),
                p99: Duration::from_millis(30),
                max: Duration::from_millis(31),
            },
        }
    }

    #[test]
    fn test_snapshot_line() {
        let line = JsonlReporter::snapshot_line(&snapshot());
        assert_eq!(line["type"], "snapshot");
        assert_eq!(line["client_id"], 3);
        assert_eq!(line["client_name"], "scan");
        assert_eq!(line["window_end_ms"], 2000);
        assert_eq!(line["rps"], 40.);
        assert_eq!(line["latency_ms"]["p99"], 30.);
    }

    #[test]
    fn test_final_line() {
        let report = RunReport {
            elapsed: Duration::from_millis(2500),
            snapshots: vec![snapshot()],
            totals: BTreeMap::from([(
                ClientId(3),
                ClientTotals {
                    requests: 40,
                    failures: 2,
                    windows: 1,
                    ..Default::default()
                },
            )]),
            clean_shutdown: true,
        };

        let line = JsonlReporter::final_line(&report);
        assert_eq!(line["type"], "final");
        assert_eq!(line["elapsed_ms"], 2500);
        assert_eq!(line["clients"][0]["client_id"], 3);
        assert_eq!(line["clients"][0]["failures"], 2);
    }
}
