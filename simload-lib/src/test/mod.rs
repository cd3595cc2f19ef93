//! Engine-level scenarios: full runs against test endpoints.

mod endpoints;

mod test_config;
mod test_shutdown;

use std::time::Duration;

use crate::{engine::EngineConfig, profile::ClientProfile};

pub(super) fn engine_config() -> EngineConfig {
    EngineConfig {
        shutdown_grace: Duration::from_secs(1),
        snapshot_buffer: 16,
        seed: Some(7),
    }
}

/// Profile with the given instance count and think time (s),
/// reporting every 100 ms.
pub(super) fn profile(client_id: u32, num_instances: usize, think_time: f64) -> ClientProfile {
    ClientProfile {
        num_instances,
        think_time,
        monitor_interval: 0.1,
        ..ClientProfile::new(client_id, format!("client-{client_id}"))
    }
}
