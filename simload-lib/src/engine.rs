//! Composition root: wires profiles, instances, scheduler,
//! aggregator and monitors into a single run.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use rama::{
    error::{ErrorContext as _, OpaqueError},
    graceful::Shutdown,
    telemetry::tracing,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    clock::SimClock,
    endpoint::ServiceEndpoint,
    profile::{ClientId, ClientProfile, ConfigError, validate_profiles},
    scheduler::Scheduler,
    stats::{
        ClientTotals, Reporter, SnapshotBoard, StatsAggregator, StatsSnapshot, monitor_client,
        report_worker,
    },
};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on the time [`EngineHandle::stop`] waits for
    /// instances and monitors to exit.
    pub shutdown_grace: Duration,
    /// Capacity of the snapshot channel towards the reporter.
    pub snapshot_buffer: usize,
    /// Seed for reproducible request sampling.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shutdown_grace: Duration::from_secs(5),
            snapshot_buffer: 64,
            seed: None,
        }
    }
}

/// A validated set of client profiles, ready to run.
#[derive(Debug)]
pub struct Engine {
    profiles: Vec<Arc<ClientProfile>>,
    config: EngineConfig,
}

impl Engine {
    /// Validate every profile before anything is started.
    ///
    /// A single invalid profile rejects the whole set.
    pub fn try_new(profiles: Vec<ClientProfile>, config: EngineConfig) -> Result<Self, ConfigError> {
        validate_profiles(&profiles)?;
        if profiles.is_empty() {
            tracing::warn!("engine created without client profiles: nothing will be scheduled");
        }

        Ok(Self {
            profiles: profiles.into_iter().map(Arc::new).collect(),
            config,
        })
    }

    pub fn profiles(&self) -> &[Arc<ClientProfile>] {
        &self.profiles
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start all instances and monitors against `endpoint`.
    ///
    /// Must be called from within a tokio runtime.
    /// Dropping the returned handle stops the run without a final flush.
    pub fn start<E: ServiceEndpoint>(
        self,
        endpoint: E,
        reporter: Option<Box<dyn Reporter>>,
    ) -> Result<EngineHandle, OpaqueError> {
        let Self { profiles, config } = self;

        let clock = SimClock::start();
        let aggregator = Arc::new(
            StatsAggregator::try_new(clock, &profiles).context("create stats aggregator")?,
        );
        let scheduler = Scheduler::new(&profiles, config.seed);
        let board = SnapshotBoard::default();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let shutdown = Shutdown::new(async move {
            if stop_rx.await.is_err() {
                tracing::debug!("engine handle dropped: shutdown");
            }
        });

        let (snapshot_tx, snapshot_rx) = mpsc::channel(config.snapshot_buffer.max(1));
        let worker = tokio::spawn(report_worker(reporter, board.clone(), snapshot_rx));

        {
            let guard = shutdown.guard();

            for profile in &profiles {
                let aggregator = aggregator.clone();
                let snapshot_tx = snapshot_tx.clone();
                let client_id = profile.client_id;
                let period = profile.monitor_period();
                guard.spawn_task_fn(move |guard| {
                    monitor_client(guard, aggregator, client_id, period, snapshot_tx)
                });
            }

            scheduler.spawn_all(&guard, Arc::new(endpoint), aggregator.clone(), clock);
        }

        tracing::info!(
            clients = profiles.len(),
            instances = profiles.iter().map(|p| p.num_instances).sum::<usize>(),
            "engine started",
        );

        Ok(EngineHandle {
            clock,
            config,
            scheduler,
            aggregator,
            board,
            stop_tx,
            shutdown,
            snapshot_tx,
            worker,
        })
    }
}

/// Handle on a running engine.
pub struct EngineHandle {
    clock: SimClock,
    config: EngineConfig,
    scheduler: Scheduler,
    aggregator: Arc<StatsAggregator>,
    board: SnapshotBoard,
    stop_tx: oneshot::Sender<()>,
    shutdown: Shutdown,
    snapshot_tx: mpsc::Sender<StatsSnapshot>,
    worker: JoinHandle<Option<Box<dyn Reporter>>>,
}

#[derive(Debug, Clone)]
/// Outcome of a finished run.
pub struct RunReport {
    pub elapsed: Duration,
    /// Every snapshot emitted during the run, final flush included.
    pub snapshots: Vec<StatsSnapshot>,
    pub totals: BTreeMap<ClientId, ClientTotals>,
    /// `false` if some tasks were still running when the grace period ran out.
    pub clean_shutdown: bool,
}

impl EngineHandle {
    pub fn clock(&self) -> SimClock {
        self.clock
    }

    pub fn active_instances(&self, client_id: ClientId) -> Option<usize> {
        self.scheduler.active_instances(client_id)
    }

    pub fn total_active(&self) -> usize {
        self.scheduler.total_active()
    }

    pub fn latest(&self, client_id: ClientId) -> Option<StatsSnapshot> {
        self.board.latest(client_id)
    }

    pub fn history(&self) -> Vec<StatsSnapshot> {
        self.board.history()
    }

    pub fn board(&self) -> SnapshotBoard {
        self.board.clone()
    }

    pub fn totals(&self) -> BTreeMap<ClientId, ClientTotals> {
        self.aggregator.totals()
    }

    /// Stop the run: cancel instances and monitors, flush the final
    /// partial windows and hand the report to the reporter.
    pub async fn stop(self) -> RunReport {
        let Self {
            clock,
            config,
            scheduler,
            aggregator,
            board,
            stop_tx,
            shutdown,
            snapshot_tx,
            worker,
        } = self;

        if stop_tx.send(()).is_err() {
            tracing::debug!("engine shutdown signal already gone");
        }

        let clean_shutdown = match shutdown.shutdown_with_limit(config.shutdown_grace).await {
            Ok(delay) => {
                tracing::debug!("engine tasks stopped with a delay of: {delay:?}");
                true
            }
            Err(err) => {
                tracing::warn!(
                    grace = ?config.shutdown_grace,
                    still_active = scheduler.total_active(),
                    "engine tasks did not stop in time: {err}",
                );
                false
            }
        };

        let elapsed = clock.now();
        for snapshot in aggregator.flush_all() {
            if let Err(err) = snapshot_tx.send(snapshot).await {
                tracing::warn!("failed to send final snapshot: {err}");
            }
        }
        drop(snapshot_tx);

        let reporter = match worker.await {
            Ok(reporter) => reporter,
            Err(err) => {
                tracing::error!("report worker failed: {err}");
                None
            }
        };

        let report = RunReport {
            elapsed,
            snapshots: board.history(),
            totals: aggregator.totals(),
            clean_shutdown,
        };

        if let Some(mut reporter) = reporter {
            reporter.finish(&report);
        }

        tracing::info!(?elapsed, snapshots = report.snapshots.len(), "engine stopped");
        report
    }
}
