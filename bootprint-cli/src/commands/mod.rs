pub mod config;
pub mod diff;
pub mod run;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use bootprint::{input::parse_document, Bootprint};

/// Module, input and override file shared by every subcommand.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Module name (`base` looks up `bootprint-base`) or module directory.
    pub module: String,

    /// Input document: YAML/JSON file path or http(s) URL.
    pub input: String,

    /// YAML/JSON file merged over the module's configuration.
    #[arg(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl SourceArgs {
    pub fn bootprint(&self) -> Result<Bootprint> {
        let Some(path) = &self.config else {
            return Ok(Bootprint::new(self.module.as_str(), Value::Null));
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = parse_document(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        tracing::debug!("loaded override configuration from {}", path.display());

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Bootprint::new(self.module.as_str(), config).with_config_dir(dir))
    }
}
