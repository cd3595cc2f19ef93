//! Client profiles: the immutable description of one workload class.
//!
//! Sizes are expressed in MB, times in seconds and ratios in `[0, 1]`.

use std::{collections::HashSet, fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{endpoint::secs, request::CostDistribution};

mod error;
mod sections;

pub use self::{
    error::ConfigError,
    sections::{
        DEFAULT_MONITOR_INTERVAL, DEFAULT_SECTION_PREFIX, ProfileSections, profiles_from_sections,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Key used to group scheduling and statistics.
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Immutable description of one workload class,
/// created at load time and kept for the lifetime of a run.
pub struct ClientProfile {
    pub client_id: ClientId,
    /// Display name, cosmetic only.
    pub client_name: String,
    /// Number of concurrent closed-loop instances.
    pub num_instances: usize,
    /// Request payload (MB).
    pub rpc_size: f64,
    /// Response payload (MB).
    pub reply_size: f64,
    /// Pure CPU processing time per request (s).
    pub rpc_time: f64,
    /// Memtable update volume (MB).
    pub mem_update_size: f64,
    /// Write-ahead log append volume (MB).
    pub log_append_size: f64,
    /// Time spent in the namenode metadata lookup (s).
    pub namenode_lookup_time: f64,
    /// Data read volume (MB).
    pub datanode_read_size: f64,
    /// Fraction of `datanode_read_size` served by a local short-circuit read.
    pub short_circuit_ratio: f64,
    /// Idle delay between a completion and the next issuance (s).
    pub think_time: f64,
    /// Statistics reporting cadence (s).
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval: f64,
    #[serde(default)]
    pub distribution: CostDistribution,
}

fn default_monitor_interval() -> f64 {
    DEFAULT_MONITOR_INTERVAL
}

impl ClientProfile {
    /// Create a profile with all costs set to zero,
    /// a single instance and the default monitor interval.
    ///
    /// Such a profile is valid and degenerates into a pure completion-ack loop.
    pub fn new(client_id: u32, client_name: impl Into<String>) -> Self {
        Self {
            client_id: ClientId(client_id),
            client_name: client_name.into(),
            num_instances: 1,
            rpc_size: 0.,
            reply_size: 0.,
            rpc_time: 0.,
            mem_update_size: 0.,
            log_append_size: 0.,
            namenode_lookup_time: 0.,
            datanode_read_size: 0.,
            short_circuit_ratio: 0.,
            think_time: 0.,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            distribution: CostDistribution::Constant,
        }
    }

    pub fn think_period(&self) -> Duration {
        secs(self.think_time)
    }

    pub fn monitor_period(&self) -> Duration {
        secs(self.monitor_interval)
    }

    /// Check every constraint of a profile.
    ///
    /// Meant to run once at load time, never per request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = self.client_id;

        if self.num_instances == 0 {
            return Err(ConfigError::invalid(id, "num_instances", "must be at least 1"));
        }

        for (field, value) in [
            ("rpc_size", self.rpc_size),
            ("reply_size", self.reply_size),
            ("rpc_time", self.rpc_time),
            ("mem_update_size", self.mem_update_size),
            ("log_append_size", self.log_append_size),
            ("namenode_lookup_time", self.namenode_lookup_time),
            ("datanode_read_size", self.datanode_read_size),
            ("think_time", self.think_time),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(id, field, format!("{value} is not finite")));
            }
            if value < 0. {
                return Err(ConfigError::invalid(id, field, format!("{value} is negative")));
            }
        }

        if !(0.0..=1.0).contains(&self.short_circuit_ratio) {
            return Err(ConfigError::invalid(
                id,
                "short_circuit_ratio",
                format!("{} is not within [0, 1]", self.short_circuit_ratio),
            ));
        }

        for (field, value) in [
            ("rpc_time", self.rpc_time),
            ("namenode_lookup_time", self.namenode_lookup_time),
            ("think_time", self.think_time),
        ] {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::invalid(
                    id,
                    field,
                    format!("{value} s does not fit a duration"),
                ));
            }
        }

        let monitor_period = Duration::try_from_secs_f64(self.monitor_interval);
        if !monitor_period.is_ok_and(|period| !period.is_zero()) {
            return Err(ConfigError::invalid(
                id,
                "monitor_interval",
                format!("{} is not a positive duration", self.monitor_interval),
            ));
        }

        self.distribution.validate(id)
    }
}

/// Validate a full set of profiles: every profile on its own,
/// and client ids unique across the set.
pub fn validate_profiles(profiles: &[ClientProfile]) -> Result<(), ConfigError> {
    let mut seen = HashSet::with_capacity(profiles.len());
    for profile in profiles {
        profile.validate()?;
        if !seen.insert(profile.client_id) {
            return Err(ConfigError::DuplicateClientId(profile.client_id));
        }
    }
    Ok(())
}
