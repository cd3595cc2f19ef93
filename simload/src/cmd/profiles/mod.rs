use clap::Args;
use rama::error::{ErrorContext as _, OpaqueError};

use crate::config::ProfileSource;

#[derive(Debug, Clone, Args)]
/// print the resolved client profiles as json
pub struct ProfilesCommand {
    #[clap(flatten)]
    source: ProfileSource,
}

pub fn exec(args: ProfilesCommand) -> Result<(), OpaqueError> {
    let profiles = args.source.load()?;
    let output = serde_json::to_string_pretty(&profiles).context("encode client profiles")?;
    println!("{output}");
    Ok(())
}
