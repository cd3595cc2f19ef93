use hbase_simload_lib::{
    engine::RunReport,
    stats::{Reporter, StatsSnapshot},
};

use super::ms;

#[derive(Debug, Default)]
pub struct HumanReporter {
    snapshots: u64,
}

impl HumanReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for HumanReporter {
    fn on_snapshot(&mut self, snapshot: &StatsSnapshot) {
        self.snapshots += 1;

        println!(
            "t={:.1}s client={} ({}) window={:.2}s reqs={} rps={:.1} ok={} fail={} timeout={} mb={:.3} mean={:.2}ms p50={:.2}ms p99={:.2}ms max={:.2}ms",
            snapshot.window_end.as_secs_f64(),
            snapshot.client_id,
            snapshot.client_name,
            snapshot.window().as_secs_f64(),
            snapshot.requests,
            snapshot.throughput(),
            snapshot.successes,
            snapshot.failures,
            snapshot.timeouts,
            snapshot.transfer_mb(),
            ms(snapshot.latency.mean),
            ms(snapshot.latency.p50),
            ms(snapshot.latency.p99),
            ms(snapshot.latency.max),
        );
    }

    fn finish(&mut self, report: &RunReport) {
        for (client_id, totals) in &report.totals {
            println!(
                "client={} total={} ok={} fail={} timeout={} mb={:.3} max={:.2}ms windows={}",
                client_id,
                totals.requests,
                totals.successes,
                totals.failures,
                totals.timeouts,
                totals.transfer_mb,
                ms(totals.max_latency),
                totals.windows,
            );
        }
        println!(
            "done elapsed={:.2}s snapshots={} clean_shutdown={}",
            report.elapsed.as_secs_f64(),
            self.snapshots,
            report.clean_shutdown,
        );
    }
}
