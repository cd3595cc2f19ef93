use std::time::Duration;

use clap::Args;
use hbase_simload_lib::{
    endpoint::{MockEndpoint, ResourceModelEndpoint},
    engine::{Engine, EngineConfig, EngineHandle},
    stats::Reporter,
};
use rama::{
    error::{ErrorContext as _, OpaqueError},
    graceful::ShutdownGuard,
    telemetry::tracing,
};

use crate::config::{EndpointConfig, EndpointKind, ProfileSource};

pub mod reporter;

use self::reporter::{HumanReporter, JsonlReporter};

#[derive(Debug, Clone, Args)]
/// run the closed-loop workload
pub struct RunCommand {
    #[clap(flatten)]
    source: ProfileSource,

    /// service endpoint to drive the workload against (defaults to the scenario's endpoint)
    #[arg(long, value_enum)]
    endpoint: Option<EndpointKind>,

    #[clap(flatten)]
    endpoint_config: Option<EndpointConfig>,

    /// report json lines instead of a human-friendly format
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Run duration (<= 0.0 = until interrupted)
    #[arg(long, value_name = "SECONDS", default_value_t = 10.)]
    duration: f64,

    /// Maximum time to wait for instances to stop at the end of the run
    #[arg(long, value_name = "SECONDS", default_value_t = 5.)]
    shutdown_grace: f64,

    /// Seed for reproducible request sampling
    #[arg(long)]
    seed: Option<u64>,
}

pub async fn exec(guard: ShutdownGuard, args: RunCommand) -> Result<(), OpaqueError> {
    let profiles = args.source.load()?;

    let scenario = args.source.scenario();
    tracing::info!("use scenario to define base endpoint config: {scenario:?}");
    let endpoint_cfg = scenario
        .endpoint_config()
        .merge(args.endpoint_config.unwrap_or_default());

    let endpoint_kind = args.endpoint.unwrap_or_else(|| scenario.endpoint_kind());
    if endpoint_kind == EndpointKind::Model {
        let ignored = endpoint_cfg.model_ignored_failures();
        if !ignored.is_empty() {
            tracing::warn!(
                ?ignored,
                "model endpoint injects no failures: settings ignored, use --endpoint mock",
            );
        }
    }

    let engine = Engine::try_new(
        profiles,
        EngineConfig {
            shutdown_grace: Duration::from_secs_f64(args.shutdown_grace.max(0.)),
            seed: args.seed,
            ..Default::default()
        },
    )
    .context("create engine")?;

    let reporter: Box<dyn Reporter> = if args.json {
        Box::new(JsonlReporter::new())
    } else {
        Box::new(HumanReporter::new())
    };

    let handle = match endpoint_kind {
        EndpointKind::Mock => {
            let endpoint = MockEndpoint::try_new(endpoint_cfg.mock_config())
                .context("create mock endpoint")?;
            engine.start(endpoint, Some(reporter))?
        }
        EndpointKind::Model => {
            let endpoint = ResourceModelEndpoint::try_new(endpoint_cfg.model_config())
                .context("create resource model endpoint")?;
            engine.start(endpoint, Some(reporter))?
        }
    };

    wait_for_end(&guard, &handle, args.duration).await;

    let report = handle.stop().await;
    if !report.clean_shutdown {
        tracing::warn!("some instances were still running at the end of the run");
    }

    tracing::info!(elapsed = ?report.elapsed, "run finished");
    Ok(())
}

async fn wait_for_end(guard: &ShutdownGuard, handle: &EngineHandle, duration: f64) {
    let run_for = (duration > 0.).then(|| Duration::from_secs_f64(duration));
    let deadline = async {
        match run_for {
            Some(run_for) => tokio::time::sleep(run_for).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = guard.cancelled() => {
            tracing::info!(
                elapsed = ?handle.clock().now(),
                "stop run early: guard shutdown",
            );
        }
        _ = deadline => {
            tracing::debug!(
                active = handle.total_active(),
                "run duration reached",
            );
        }
    }
}
