use hbase_simload_lib::profile::ClientProfile;
use rama::telemetry::tracing;

/// Overrides applied to every loaded client profile.
#[derive(Debug, Clone, clap::Args, Default)]
pub struct ClientConfig {
    /// Number of concurrent closed-loop instances per client.
    #[arg(long, value_name = "N")]
    pub num_instances: Option<usize>,

    /// Idle delay between a completion and the next request.
    #[arg(long, value_name = "SECONDS")]
    pub think_time: Option<f64>,

    /// Statistics reporting cadence.
    #[arg(long, value_name = "SECONDS")]
    pub monitor_interval: Option<f64>,

    /// Fraction of the data read served by a local short-circuit read.
    #[arg(long, value_name = "RATIO")]
    pub short_circuit_ratio: Option<f64>,
}

impl ClientConfig {
    pub fn apply(&self, profile: &mut ClientProfile) {
        macro_rules! overwrite {
            ($overwrite:ident, $profile:ident, {$($property:ident),+ $(,)?}) => {
                $(
                    if let Some(value) = $overwrite.$property {
                        tracing::info!(
                            client_id = %$profile.client_id,
                            "property '{}': use overwrite: {value}",
                            stringify!($property),
                        );
                        $profile.$property = value;
                    }
                )+
            };
        }

        let overwrite = self;
        overwrite!(
            overwrite, profile,
            {
                num_instances,
                think_time,
                monitor_interval,
                short_circuit_ratio,
            }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_only_overwrites_defined_values() {
        let mut profile = ClientProfile {
            num_instances: 4,
            think_time: 0.5,
            ..ClientProfile::new(1, "get")
        };

        ClientConfig {
            num_instances: Some(12),
            short_circuit_ratio: Some(0.75),
            ..Default::default()
        }
        .apply(&mut profile);

        assert_eq!(profile.num_instances, 12);
        assert_eq!(profile.think_time, 0.5);
        assert_eq!(profile.short_circuit_ratio, 0.75);
    }
}
