use hbase_simload_lib::{profile::ClientProfile, request::CostDistribution};

use super::{EndpointConfig, EndpointKind};

/// High level workload scenarios.
/// Each scenario is a preset of client profiles and endpoint behavior.
#[derive(Debug, Clone, Copy, clap::ValueEnum, Default, PartialEq, Eq)]
pub enum Scenario {
    /// Point reads, small writes and a few long scans side by side.
    #[default]
    HbaseMixed,

    /// Many concurrent readers, mostly served by short-circuit reads.
    /// Used to observe datanode and handler contention.
    ReadHeavy,

    /// Mixed workload against slow and unreliable storage.
    /// Used to observe failure accounting and tail latency.
    FlakyStorage,
}

impl Scenario {
    /// Construct the client profiles associated with this scenario.
    pub fn profiles(self) -> Vec<ClientProfile> {
        match self {
            Scenario::HbaseMixed | Scenario::FlakyStorage => {
                vec![get(1, 8, 0.7), put(2, 4), scan(3, 2)]
            }
            Scenario::ReadHeavy => vec![get(1, 32, 0.9), scan(2, 8)],
        }
    }

    /// Endpoint used when none is selected explicitly.
    ///
    /// Only the mock endpoint injects errors and timeouts.
    pub fn endpoint_kind(self) -> EndpointKind {
        match self {
            Scenario::HbaseMixed | Scenario::ReadHeavy => EndpointKind::Model,
            Scenario::FlakyStorage => EndpointKind::Mock,
        }
    }

    /// Construct the endpoint configuration associated with this scenario.
    pub fn endpoint_config(self) -> EndpointConfig {
        match self {
            Scenario::HbaseMixed => {
                // Fast and fully reliable.
                EndpointConfig {
                    base_latency: Some(0.002),
                    jitter: Some(0.001),
                    ..Default::default()
                }
            }

            Scenario::ReadHeavy => {
                // Few handlers for the amount of readers: requests queue.
                EndpointConfig {
                    base_latency: Some(0.005),
                    jitter: Some(0.002),
                    rpc_handlers: Some(16),
                    ..Default::default()
                }
            }

            Scenario::FlakyStorage => {
                // Storage occasionally errors or stalls, remote reads are slow.
                EndpointConfig {
                    base_latency: Some(0.02),
                    jitter: Some(0.015),
                    error_rate: Some(0.05),
                    timeout_rate: Some(0.02),
                    timeout: Some(0.5),
                    datanodes: Some(2),
                    remote_read_bandwidth: Some(50.),
                    ..Default::default()
                }
            }
        }
    }
}

fn get(client_id: u32, num_instances: usize, short_circuit_ratio: f64) -> ClientProfile {
    ClientProfile {
        num_instances,
        rpc_size: 0.0005,
        reply_size: 0.004,
        rpc_time: 0.0002,
        namenode_lookup_time: 0.0005,
        datanode_read_size: 0.064,
        short_circuit_ratio,
        think_time: 0.01,
        monitor_interval: 1.,
        ..ClientProfile::new(client_id, "get")
    }
}

fn put(client_id: u32, num_instances: usize) -> ClientProfile {
    ClientProfile {
        num_instances,
        rpc_size: 0.004,
        reply_size: 0.0002,
        rpc_time: 0.0001,
        mem_update_size: 0.004,
        log_append_size: 0.004,
        think_time: 0.005,
        monitor_interval: 1.,
        ..ClientProfile::new(client_id, "put")
    }
}

fn scan(client_id: u32, num_instances: usize) -> ClientProfile {
    ClientProfile {
        num_instances,
        rpc_size: 0.001,
        reply_size: 0.5,
        rpc_time: 0.001,
        namenode_lookup_time: 0.001,
        datanode_read_size: 0.5,
        short_circuit_ratio: 0.3,
        think_time: 0.05,
        monitor_interval: 1.,
        distribution: CostDistribution::Exponential,
        ..ClientProfile::new(client_id, "scan")
    }
}
