use rama::telemetry::tracing;
use serde_json::{Map, Value};

use super::{ClientId, ClientProfile, ConfigError, validate_profiles};
use crate::request::CostDistribution;

/// Monitor interval (s) used for sections that do not define one.
pub const DEFAULT_MONITOR_INTERVAL: f64 = 10.;

/// Sections holding client profiles contain this in their name.
pub const DEFAULT_SECTION_PREFIX: &str = "hbase_client";

/// Named configuration sections, already parsed by a collaborator
/// (e.g. `serde_json`), which may also contain non-client sections.
pub type ProfileSections = Map<String, Value>;

/// Build the client profiles found in `sections`.
///
/// Only sections with `prefix` in their name are considered.
/// Missing options fail with [`ConfigError::MissingOption`],
/// and the resulting set is validated as a whole.
/// No matching section at all is not an error, but it is logged.
pub fn profiles_from_sections(
    sections: &ProfileSections,
    prefix: &str,
) -> Result<Vec<ClientProfile>, ConfigError> {
    let mut profiles = Vec::new();

    for (name, value) in sections {
        if !name.contains(prefix) {
            tracing::trace!(section = %name, %prefix, "skip non-client section");
            continue;
        }

        let section = SectionReader {
            name,
            options: value.as_object().ok_or_else(|| ConfigError::InvalidOption {
                section: name.clone(),
                option: "*",
                reason: "section is not a table of options".to_owned(),
            })?,
        };

        let profile = ClientProfile {
            client_id: ClientId(section.uint("client_id")?),
            client_name: section.string("client_name")?,
            num_instances: section.uint::<usize>("num_instances")?,
            rpc_size: section.float("rpc_size")?,
            reply_size: section.float("reply_size")?,
            rpc_time: section.float("rpc_time")?,
            mem_update_size: section.float("mem_update_size")?,
            log_append_size: section.float("log_append_size")?,
            namenode_lookup_time: section.float("namenode_lookup_time")?,
            datanode_read_size: section.float("datanode_read_size")?,
            short_circuit_ratio: section.float("short_circuit_ratio")?,
            think_time: section.float("think_time")?,
            monitor_interval: section
                .optional_float("monitor_interval")?
                .unwrap_or(DEFAULT_MONITOR_INTERVAL),
            distribution: section.distribution()?,
        };

        tracing::debug!(
            section = %name,
            client_id = %profile.client_id,
            client_name = %profile.client_name,
            num_instances = profile.num_instances,
            "client profile loaded",
        );
        profiles.push(profile);
    }

    if profiles.is_empty() {
        tracing::warn!(%prefix, "no client configuration section found, returning an empty list");
    }

    validate_profiles(&profiles)?;
    Ok(profiles)
}

struct SectionReader<'a> {
    name: &'a str,
    options: &'a Map<String, Value>,
}

impl SectionReader<'_> {
    fn get(&self, option: &'static str) -> Result<&Value, ConfigError> {
        self.options
            .get(option)
            .ok_or_else(|| ConfigError::MissingOption {
                section: self.name.to_owned(),
                option,
            })
    }

    fn invalid(&self, option: &'static str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidOption {
            section: self.name.to_owned(),
            option,
            reason: reason.into(),
        }
    }

    fn uint<T: TryFrom<u64>>(&self, option: &'static str) -> Result<T, ConfigError> {
        let value = self.get(option)?;
        value
            .as_u64()
            .and_then(|n| T::try_from(n).ok())
            .ok_or_else(|| self.invalid(option, format!("expected an unsigned integer, got {value}")))
    }

    fn float(&self, option: &'static str) -> Result<f64, ConfigError> {
        let value = self.get(option)?;
        value
            .as_f64()
            .ok_or_else(|| self.invalid(option, format!("expected a number, got {value}")))
    }

    fn optional_float(&self, option: &'static str) -> Result<Option<f64>, ConfigError> {
        match self.options.get(option) {
            Some(_) => self.float(option).map(Some),
            None => Ok(None),
        }
    }

    fn string(&self, option: &'static str) -> Result<String, ConfigError> {
        let value = self.get(option)?;
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Ok(other.to_string()),
        }
    }

    fn distribution(&self) -> Result<CostDistribution, ConfigError> {
        match self.options.get("distribution") {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|err| self.invalid("distribution", err.to_string())),
            None => Ok(CostDistribution::Constant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tracing_test::traced_test;

    fn get_section(client_id: u32) -> Value {
        json!({
            "client_id": client_id,
            "client_name": format!("client-{client_id}"),
            "num_instances": 10,
            "rpc_size": 0.001,
            "reply_size": 0.002,
            "rpc_time": 0.0001,
            "mem_update_size": 0,
            "log_append_size": 0,
            "namenode_lookup_time": 0,
            "datanode_read_size": 0,
            "short_circuit_ratio": 0,
            "think_time": 0,
        })
    }

    fn sections(entries: Vec<(&str, Value)>) -> ProfileSections {
        entries
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect()
    }

    #[test]
    fn test_profiles_from_sections_filters_prefix() {
        let sections = sections(vec![
            ("hbase_client_get", get_section(1)),
            ("hbase_client_scan", {
                let mut v = get_section(2);
                v["monitor_interval"] = json!(0.5);
                v
            }),
            ("hdfs", json!({ "replica": 3 })),
        ]);

        let profiles = profiles_from_sections(&sections, DEFAULT_SECTION_PREFIX).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].client_id, ClientId(1));
        assert_eq!(profiles[0].monitor_interval, DEFAULT_MONITOR_INTERVAL);
        assert_eq!(profiles[1].client_name, "client-2");
        assert_eq!(profiles[1].monitor_interval, 0.5);
    }

    #[test]
    fn test_profiles_from_sections_missing_option() {
        let mut section = get_section(1);
        section.as_object_mut().unwrap().remove("think_time");

        let err = profiles_from_sections(
            &sections(vec![("hbase_client_get", section)]),
            DEFAULT_SECTION_PREFIX,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingOption {
                section: "hbase_client_get".to_owned(),
                option: "think_time",
            }
        );
    }

    #[test]
    fn test_profiles_from_sections_validates() {
        let mut section = get_section(1);
        section["short_circuit_ratio"] = json!(1.5);

        let err = profiles_from_sections(
            &sections(vec![("hbase_client_get", section)]),
            DEFAULT_SECTION_PREFIX,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidProfile {
                field: "short_circuit_ratio",
                ..
            }
        ));
    }

    #[test]
    fn test_profiles_from_sections_distribution() {
        let mut section = get_section(1);
        section["distribution"] = json!({ "uniform": { "spread": 0.25 } });

        let profiles = profiles_from_sections(
            &sections(vec![("hbase_client_get", section)]),
            DEFAULT_SECTION_PREFIX,
        )
        .unwrap();
        assert_eq!(
            profiles[0].distribution,
            CostDistribution::Uniform { spread: 0.25 }
        );
    }

    #[traced_test]
    #[test]
    fn test_profiles_from_sections_empty_warns() {
        let profiles = profiles_from_sections(
            &sections(vec![("hdfs", json!({}))]),
            DEFAULT_SECTION_PREFIX,
        )
        .unwrap();
        assert!(profiles.is_empty());
        assert!(logs_contain("no client configuration section found"));
    }
}
