//! `bootprint config` — print the merged configuration, input included.

use anyhow::{Context, Result};
use clap::Args;

use super::SourceArgs;

/// Arguments for `bootprint config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Emit JSON instead of YAML.
    #[arg(long)]
    pub json: bool,
}

impl ConfigArgs {
    pub async fn run(self) -> Result<()> {
        let bootprint = self.source.bootprint()?;
        let config = bootprint.merged_config(self.source.input.as_str()).await?;

        let text = if self.json {
            serde_json::to_string_pretty(&config).context("failed to serialize configuration")?
        } else {
            serde_yaml::to_string(&config).context("failed to serialize configuration")?
        };
        println!("{}", text.trim_end());
        Ok(())
    }
}
