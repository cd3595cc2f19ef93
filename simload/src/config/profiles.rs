use std::path::PathBuf;

use hbase_simload_lib::profile::{
    ClientProfile, DEFAULT_SECTION_PREFIX, ProfileSections, profiles_from_sections,
    validate_profiles,
};
use rama::{
    error::{ErrorContext as _, OpaqueError},
    telemetry::tracing,
};

use super::{ClientConfig, Scenario};

/// Where the client profiles of a run come from.
#[derive(Debug, Clone, clap::Args)]
pub struct ProfileSource {
    /// JSON file with named configuration sections;
    /// sections containing the section prefix in their name define a client.
    #[arg(long = "profiles", value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Scenario to run,
    /// manually defined parameters overwrite scenario parameters.
    ///
    /// Only provides the profiles when no profiles file is given.
    #[arg(long)]
    pub scenario: Option<Scenario>,

    /// Name fragment identifying client sections in the profiles file.
    #[arg(long, default_value = DEFAULT_SECTION_PREFIX)]
    pub section_prefix: String,

    #[clap(flatten)]
    pub client: Option<ClientConfig>,
}

impl ProfileSource {
    pub fn scenario(&self) -> Scenario {
        self.scenario.unwrap_or_default()
    }

    /// Resolve and validate the client profiles.
    pub fn load(&self) -> Result<Vec<ClientProfile>, OpaqueError> {
        let mut profiles = match self.path.as_deref() {
            Some(path) => {
                tracing::info!(path = %path.display(), "load client profiles from file");
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("read profiles file {}", path.display()))?;
                let sections: ProfileSections =
                    serde_json::from_str(&raw).context("parse profiles file as json sections")?;
                profiles_from_sections(&sections, &self.section_prefix)
                    .context("load client profiles")?
            }
            None => {
                let scenario = self.scenario();
                tracing::info!("use scenario to define client profiles: {scenario:?}");
                scenario.profiles()
            }
        };

        if let Some(client) = self.client.as_ref() {
            for profile in profiles.iter_mut() {
                client.apply(profile);
            }
        }

        validate_profiles(&profiles).context("validate client profiles")?;
        Ok(profiles)
    }
}
