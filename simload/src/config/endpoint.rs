use hbase_simload_lib::endpoint::{MockEndpointConfig, ResourceModelConfig};
use rama::telemetry::tracing;

/// Service endpoint the workload is driven against.
#[derive(Debug, Clone, Copy, clap::ValueEnum, Default, PartialEq, Eq)]
pub enum EndpointKind {
    /// Fixed latency profile, ignoring the request cost.
    Mock,

    /// Queuing model of a region server on top of HDFS.
    #[default]
    Model,
}

/// Endpoint side configuration.
/// Defined values overwrite the scenario ones.
#[derive(Debug, Clone, clap::Args, Default)]
pub struct EndpointConfig {
    /// Mock: base processing time before responding.
    #[arg(long, value_name = "SECONDS")]
    pub base_latency: Option<f64>,

    /// Mock: random delay added to (or removed from) the base latency.
    #[arg(long, value_name = "SECONDS")]
    pub jitter: Option<f64>,

    /// Probability of failing a request.
    #[arg(long, value_name = "RATIO")]
    pub error_rate: Option<f32>,

    /// Probability of a request timing out.
    #[arg(long, value_name = "RATIO")]
    pub timeout_rate: Option<f32>,

    /// Time it takes before a timed-out request reports back.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<f64>,

    /// Model: rpc handlers processing requests concurrently.
    #[arg(long, value_name = "N")]
    pub rpc_handlers: Option<usize>,

    /// Model: datanodes serving remote reads.
    #[arg(long, value_name = "N")]
    pub datanodes: Option<usize>,

    /// Model: remote read bandwidth per datanode.
    #[arg(long, value_name = "MB/S")]
    pub remote_read_bandwidth: Option<f64>,
}

impl EndpointConfig {
    /// Merge `overwrite` on top of `self`.
    pub fn merge(self, overwrite: EndpointConfig) -> EndpointConfig {
        macro_rules! merge_config {
            ($scenario:ident, $overwrite:ident, {$($property:ident),+ $(,)?}) => {
                EndpointConfig {
                    $(
                        $property: if let Some(value) = $overwrite.$property {
                            tracing::info!("property '{}': use overwrite: {value}", stringify!($property));
                            Some(value)
                        } else if let Some(value) = $scenario.$property {
                            tracing::info!("property '{}': use scenario: {value}", stringify!($property));
                            Some(value)
                        } else {
                            tracing::debug!("property '{}': undefined", stringify!($property));
                            None
                        },
                    )+
                }
            };
        }

        let scenario = self;
        merge_config!(
            scenario, overwrite,
            {
                base_latency,
                jitter,
                error_rate,
                timeout_rate,
                timeout,
                rpc_handlers,
                datanodes,
                remote_read_bandwidth,
            }
        )
    }

    pub fn mock_config(&self) -> MockEndpointConfig {
        MockEndpointConfig {
            base_latency: self.base_latency.unwrap_or_default(),
            jitter: self.jitter.unwrap_or_default(),
            error_rate: self.error_rate.unwrap_or_default(),
            timeout_rate: self.timeout_rate.unwrap_or_default(),
            timeout: self.timeout.unwrap_or(1.),
        }
    }

    /// Failure settings that are defined but which the model endpoint ignores.
    pub fn model_ignored_failures(&self) -> Vec<&'static str> {
        [
            ("error_rate", self.error_rate.is_some()),
            ("timeout_rate", self.timeout_rate.is_some()),
            ("timeout", self.timeout.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, defined)| defined.then_some(name))
        .collect()
    }

    /// The model takes no timeout: slow requests queue instead.
    pub fn model_config(&self) -> ResourceModelConfig {
        let defaults = ResourceModelConfig::default();
        ResourceModelConfig {
            rpc_handlers: self.rpc_handlers.unwrap_or(defaults.rpc_handlers),
            datanodes: self.datanodes.unwrap_or(defaults.datanodes),
            remote_read_bandwidth: self
                .remote_read_bandwidth
                .unwrap_or(defaults.remote_read_bandwidth),
            ..defaults
        }
    }
}
