use std::sync::Arc;

use rama::{graceful::ShutdownGuard, telemetry::tracing};
use rand::{SeedableRng as _, rngs::SmallRng};

use crate::{
    clock::SimClock,
    endpoint::ServiceEndpoint,
    instance::{ActiveInstances, Instance, InstanceId},
    profile::{ClientId, ClientProfile},
    request::RequestModel,
    stats::StatsAggregator,
};

/// Owns the instance pool of every client profile.
///
/// Each profile gets exactly `num_instances` closed-loop instances,
/// all of them spawned on the same shutdown guard.
pub struct Scheduler {
    pools: Vec<InstancePool>,
    seed: Option<u64>,
}

struct InstancePool {
    profile: Arc<ClientProfile>,
    active: ActiveInstances,
}

impl Scheduler {
    /// `seed` makes request sampling reproducible per instance;
    /// without it every instance seeds from the OS.
    pub fn new(profiles: &[Arc<ClientProfile>], seed: Option<u64>) -> Self {
        Self {
            pools: profiles
                .iter()
                .map(|profile| InstancePool {
                    profile: profile.clone(),
                    active: ActiveInstances::default(),
                })
                .collect(),
            seed,
        }
    }

    /// Spawn all instances of all pools.
    ///
    /// Instances run until `guard` is cancelled.
    pub fn spawn_all<E: ServiceEndpoint>(
        &self,
        guard: &ShutdownGuard,
        endpoint: Arc<E>,
        aggregator: Arc<StatsAggregator>,
        clock: SimClock,
    ) {
        let mut stream = 0u64;
        for pool in &self.pools {
            let model = RequestModel::new(pool.profile.clone());
            let client_id = pool.profile.client_id;

            tracing::info!(
                %client_id,
                client_name = %pool.profile.client_name,
                instances = pool.profile.num_instances,
                "spawn client instances",
            );

            for index in 0..pool.profile.num_instances {
                let rng = match self.seed {
                    Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(stream)),
                    None => SmallRng::from_os_rng(),
                };
                stream += 1;

                let instance = Instance::new(
                    InstanceId { client_id, index },
                    model.clone(),
                    endpoint.clone(),
                    aggregator.clone(),
                    clock,
                    pool.active.clone(),
                    rng,
                );
                guard.spawn_task_fn(move |guard| instance.run(guard));
            }
        }
    }

    /// Instances of `client_id` currently running their loop.
    pub fn active_instances(&self, client_id: ClientId) -> Option<usize> {
        self.pools
            .iter()
            .find(|pool| pool.profile.client_id == client_id)
            .map(|pool| pool.active.get())
    }

    pub fn total_active(&self) -> usize {
        self.pools.iter().map(|pool| pool.active.get()).sum()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<ClientProfile>> {
        self.pools.iter().map(|pool| &pool.profile)
    }
}
