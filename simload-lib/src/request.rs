//! Translation of a client profile into the resource cost of one request.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::profile::{ClientId, ClientProfile, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Distribution each scalar cost of a profile is drawn from.
///
/// The profile value is always the mean of the distribution.
pub enum CostDistribution {
    /// Degenerate distribution: every request costs exactly the mean.
    #[default]
    Constant,
    /// Uniform within `mean * (1 ± spread)`, `spread` in `[0, 1]`.
    Uniform { spread: f64 },
    /// Exponential with the given mean.
    Exponential,
}

impl CostDistribution {
    pub(crate) fn validate(&self, client_id: ClientId) -> Result<(), ConfigError> {
        match *self {
            CostDistribution::Uniform { spread } if !(0.0..=1.0).contains(&spread) => {
                Err(ConfigError::InvalidProfile {
                    client_id,
                    field: "distribution",
                    reason: format!("uniform spread {spread} is not within [0, 1]"),
                })
            }
            _ => Ok(()),
        }
    }

    /// Draw one non-negative value with the given mean.
    pub fn sample<R: Rng + ?Sized>(&self, mean: f64, rng: &mut R) -> f64 {
        if mean <= 0. {
            return 0.;
        }
        match *self {
            CostDistribution::Constant => mean,
            CostDistribution::Uniform { spread } => {
                let u: f64 = rng.random();
                (mean * (1. + spread * (2. * u - 1.))).max(0.)
            }
            CostDistribution::Exponential => {
                let u: f64 = rng.random();
                -mean * (1. - u).ln()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
/// Resolved resource cost vector of a single request.
///
/// Sizes in MB, times in seconds.
pub struct RequestCost {
    pub cpu_time: f64,
    pub mem_write_mb: f64,
    pub log_write_mb: f64,
    pub lookup_time: f64,
    pub local_read_mb: f64,
    pub remote_read_mb: f64,
    pub request_mb: f64,
    pub response_mb: f64,
}

impl RequestCost {
    /// Total read volume, local and remote.
    pub fn read_mb(&self) -> f64 {
        self.local_read_mb + self.remote_read_mb
    }

    /// Bytes moved over the client connection (request + response), in MB.
    pub fn transfer_mb(&self) -> f64 {
        self.request_mb + self.response_mb
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
/// A request as handed to a service endpoint.
pub struct Submission {
    pub client_id: ClientId,
    pub cost: RequestCost,
}

#[derive(Debug, Clone)]
/// Builds the cost vector of requests for one (already validated) profile.
pub struct RequestModel {
    profile: Arc<ClientProfile>,
}

impl RequestModel {
    pub fn new(profile: Arc<ClientProfile>) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ClientProfile {
        &self.profile
    }

    /// Build the cost vector of the next request.
    ///
    /// With [`CostDistribution::Constant`] the result does not depend on `rng`.
    pub fn build_request<R: Rng + ?Sized>(&self, rng: &mut R) -> RequestCost {
        let p = &*self.profile;
        let dist = p.distribution;

        let read_mb = dist.sample(p.datanode_read_size, rng);
        let local_read_mb = read_mb * p.short_circuit_ratio;

        RequestCost {
            cpu_time: dist.sample(p.rpc_time, rng),
            mem_write_mb: dist.sample(p.mem_update_size, rng),
            log_write_mb: dist.sample(p.log_append_size, rng),
            lookup_time: dist.sample(p.namenode_lookup_time, rng),
            local_read_mb,
            remote_read_mb: (read_mb - local_read_mb).max(0.),
            request_mb: dist.sample(p.rpc_size, rng),
            response_mb: dist.sample(p.reply_size, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{SeedableRng as _, rngs::SmallRng};

    fn model(ratio: f64, distribution: CostDistribution) -> RequestModel {
        RequestModel::new(Arc::new(ClientProfile {
            rpc_size: 0.001,
            reply_size: 0.002,
            rpc_time: 0.0001,
            mem_update_size: 0.01,
            log_append_size: 0.02,
            namenode_lookup_time: 0.0005,
            datanode_read_size: 0.064,
            short_circuit_ratio: ratio,
            distribution,
            ..ClientProfile::new(1, "get")
        }))
    }

    #[test]
    fn test_constant_cost_vector() {
        let mut rng = SmallRng::seed_from_u64(1);
        let cost = model(0.25, CostDistribution::Constant).build_request(&mut rng);

        assert_eq!(cost.cpu_time, 0.0001);
        assert_eq!(cost.mem_write_mb, 0.01);
        assert_eq!(cost.log_write_mb, 0.02);
        assert_eq!(cost.lookup_time, 0.0005);
        assert!((cost.local_read_mb - 0.016).abs() < 1e-12);
        assert!((cost.remote_read_mb - 0.048).abs() < 1e-12);
        assert_eq!(cost.request_mb, 0.001);
        assert_eq!(cost.response_mb, 0.002);
        assert!((cost.transfer_mb() - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_constant_is_deterministic() {
        let model = model(0.5, CostDistribution::Constant);
        let a = model.build_request(&mut SmallRng::seed_from_u64(1));
        let b = model.build_request(&mut SmallRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_read_split_sums_to_read_size() {
        let mut rng = SmallRng::seed_from_u64(7);
        for ratio in [0., 0.1, 1. / 3., 0.5, 0.9, 1.] {
            let cost = model(ratio, CostDistribution::Constant).build_request(&mut rng);
            assert!(cost.local_read_mb >= 0.);
            assert!(cost.remote_read_mb >= 0.);
            assert!((cost.read_mb() - 0.064).abs() < 1e-12, "ratio: {ratio}");
        }
    }

    #[test]
    fn test_sampled_read_split_is_consistent() {
        let mut rng = SmallRng::seed_from_u64(3);
        let model = model(0.3, CostDistribution::Exponential);
        for _ in 0..1000 {
            let cost = model.build_request(&mut rng);
            assert!(cost.local_read_mb >= 0.);
            assert!(cost.remote_read_mb >= 0.);
            assert!((cost.local_read_mb - cost.read_mb() * 0.3).abs() < 1e-9);
        }
    }

    #[test]
    fn test_uniform_bounds() {
        let mut rng = SmallRng::seed_from_u64(9);
        let dist = CostDistribution::Uniform { spread: 0.25 };
        for _ in 0..1000 {
            let v = dist.sample(10., &mut rng);
            assert!((7.5..=12.5).contains(&v), "value: {v}");
        }
    }

    #[test]
    fn test_zero_mean_is_always_zero() {
        let mut rng = SmallRng::seed_from_u64(11);
        for dist in [
            CostDistribution::Constant,
            CostDistribution::Uniform { spread: 1. },
            CostDistribution::Exponential,
        ] {
            assert_eq!(dist.sample(0., &mut rng), 0.);
        }
        let cost = RequestModel::new(Arc::new(ClientProfile::new(1, "zero")))
            .build_request(&mut rng);
        assert!(cost.is_zero());
    }

    #[test]
    fn test_invalid_uniform_spread() {
        assert!(
            CostDistribution::Uniform { spread: 1.5 }
                .validate(ClientId(3))
                .is_err()
        );
        assert!(CostDistribution::Exponential.validate(ClientId(3)).is_ok());
    }
}
