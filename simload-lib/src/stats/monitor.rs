use std::{sync::Arc, time::Duration};

use rama::{graceful::ShutdownGuard, telemetry::tracing};
use tokio::{
    sync::mpsc::{Receiver, Sender},
    time::{Instant, MissedTickBehavior},
};

use super::{Reporter, SnapshotBoard, StatsAggregator, StatsSnapshot};
use crate::profile::ClientId;

/// Cut the window of one client every `period`,
/// independently of the instances and of other clients.
pub(crate) async fn monitor_client(
    guard: ShutdownGuard,
    aggregator: Arc<StatsAggregator>,
    client_id: ClientId,
    period: Duration,
    snapshot_tx: Sender<StatsSnapshot>,
) {
    let first_tick = Instant::now().checked_add(period).filter(|_| !period.is_zero());
    let Some(first_tick) = first_tick else {
        tracing::warn!(
            %client_id,
            ?period,
            "monitor period out of range: window cut at flush only",
        );
        guard.cancelled().await;
        return;
    };

    let mut ticker = tokio::time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = guard.cancelled() => {
                tracing::debug!(%client_id, "exit monitor: guard shutdown");
                return;
            }
            _ = ticker.tick() => (),
        }

        let Some(snapshot) = aggregator.take_window(client_id) else {
            tracing::trace!(%client_id, "monitor tick without activity");
            continue;
        };

        if let Err(err) = snapshot_tx.send(snapshot).await {
            tracing::debug!(%client_id, "exit monitor: failed to send snapshot: {err}");
            return;
        }
    }
}

/// Hand every snapshot to the reporter and the board,
/// until all snapshot senders are dropped.
pub(crate) async fn report_worker(
    mut reporter: Option<Box<dyn Reporter>>,
    board: SnapshotBoard,
    mut snapshot_rx: Receiver<StatsSnapshot>,
) -> Option<Box<dyn Reporter>> {
    while let Some(snapshot) = snapshot_rx.recv().await {
        tracing::debug!(
            client_id = %snapshot.client_id,
            requests = snapshot.requests,
            failures = snapshot.failures,
            window_end = ?snapshot.window_end,
            "snapshot emitted",
        );
        if let Some(reporter) = reporter.as_mut() {
            reporter.on_snapshot(&snapshot);
        }
        board.push(snapshot);
    }

    tracing::debug!("exit report worker: snapshot senders closed");
    reporter
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use rama::graceful::Shutdown;
    use tokio::sync::mpsc;

    use crate::{
        clock::SimClock,
        profile::ClientProfile,
        stats::{Outcome, RequestRecord},
    };

    fn record(client_id: ClientId) -> RequestRecord {
        RequestRecord {
            client_id,
            instance: 0,
            issued_at: Duration::ZERO,
            completed_at: Duration::from_millis(1),
            request_mb: 0.,
            response_mb: 0.,
            outcome: Outcome::Success,
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_monitors_tick_independently() {
        tokio::time::pause();

        let profiles = [
            Arc::new(ClientProfile::new(1, "fast")),
            Arc::new(ClientProfile::new(2, "slow")),
        ];
        let aggregator =
            Arc::new(StatsAggregator::try_new(SimClock::start(), &profiles).unwrap());

        let shutdown = Shutdown::new(std::future::pending::<()>());
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel(16);

        for (client_id, period) in [
            (ClientId(1), Duration::from_millis(100)),
            (ClientId(2), Duration::from_millis(250)),
        ] {
            let aggregator = aggregator.clone();
            let snapshot_tx = snapshot_tx.clone();
            shutdown.spawn_task_fn(move |guard| {
                monitor_client(guard, aggregator, client_id, period, snapshot_tx)
            });
        }
        drop(snapshot_tx);

        aggregator.record(record(ClientId(1)));
        aggregator.record(record(ClientId(2)));

        tokio::time::sleep(Duration::from_millis(110)).await;
        let first = snapshot_rx.try_recv().unwrap();
        assert_eq!(first.client_id, ClientId(1));
        assert!(first.window_end >= Duration::from_millis(100));
        assert!(first.window_end < Duration::from_millis(110));
        assert!(snapshot_rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(150)).await;
        let second = snapshot_rx.try_recv().unwrap();
        assert_eq!(second.client_id, ClientId(2));
        assert!(second.window_end >= Duration::from_millis(250));
        assert!(second.window_end < Duration::from_millis(260));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_out_of_range_period_waits_for_shutdown() {
        tokio::time::pause();

        let profiles = [Arc::new(ClientProfile::new(1, "odd"))];
        let aggregator =
            Arc::new(StatsAggregator::try_new(SimClock::start(), &profiles).unwrap());
        aggregator.record(record(ClientId(1)));

        let shutdown = Shutdown::new(tokio::time::sleep(Duration::from_secs(5)));
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel(16);
        for period in [Duration::ZERO, Duration::MAX] {
            let aggregator = aggregator.clone();
            let snapshot_tx = snapshot_tx.clone();
            shutdown.spawn_task_fn(move |guard| {
                monitor_client(guard, aggregator, ClientId(1), period, snapshot_tx)
            });
        }
        drop(snapshot_tx);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(snapshot_rx.try_recv().is_err());

        shutdown
            .shutdown_with_limit(Duration::from_secs(10))
            .await
            .unwrap();
        assert!(snapshot_rx.recv().await.is_none());
        assert_eq!(aggregator.flush_all()[0].requests, 1);
    }

    struct CountingReporter {
        snapshots: Arc<AtomicUsize>,
    }

    impl Reporter for CountingReporter {
        fn on_snapshot(&mut self, _snapshot: &StatsSnapshot) {
            self.snapshots.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_report_worker_drains_until_closed() {
        let profiles = [Arc::new(ClientProfile::new(1, "get"))];
        let aggregator = StatsAggregator::try_new(SimClock::start(), &profiles).unwrap();
        let board = SnapshotBoard::default();
        let (snapshot_tx, snapshot_rx) = mpsc::channel(4);
        let counter = Arc::new(AtomicUsize::new(0));

        let worker = tokio::spawn(report_worker(
            Some(Box::new(CountingReporter {
                snapshots: counter.clone(),
            })),
            board.clone(),
            snapshot_rx,
        ));

        for _ in 0..3 {
            aggregator.record(record(ClientId(1)));
            snapshot_tx
                .send(aggregator.take_window(ClientId(1)).unwrap())
                .await
                .unwrap();
        }
        drop(snapshot_tx);

        assert!(worker.await.unwrap().is_some());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(board.history().len(), 3);
        assert_eq!(board.history_for(ClientId(1)).len(), 3);
        assert_eq!(board.latest(ClientId(1)).unwrap().requests, 1);
    }
}
