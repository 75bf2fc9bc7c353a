//! `bootprint diff` — show unified diffs for what `run` would write.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::SourceArgs;

/// Arguments for `bootprint diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory to compare the rendered files against.
    pub target_dir: PathBuf,
}

impl DiffArgs {
    pub async fn run(self) -> Result<()> {
        let bootprint = self.source.bootprint()?;
        let diffs = bootprint.diff(self.source.input.as_str(), &self.target_dir).await?;

        if diffs.is_empty() {
            println!("No differences in '{}'.", self.target_dir.display());
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
