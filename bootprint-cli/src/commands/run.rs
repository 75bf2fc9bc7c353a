//! `bootprint run` — render the input with a module and write the result.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use bootprint::{RunOptions, RunReport, WriteResult};

use super::SourceArgs;

/// Arguments for `bootprint run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Directory the rendered files are written to.
    pub target_dir: PathBuf,

    /// Show what would be written without actually writing any files.
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    pub async fn run(self) -> Result<()> {
        let bootprint = self.source.bootprint()?;
        let options = RunOptions::new(&self.target_dir).dry_run(self.dry_run);
        let report = bootprint.run(self.source.input.as_str(), &options).await?;
        print_report(&report, self.dry_run);
        Ok(())
    }
}

fn print_report(report: &RunReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let target = report.target_dir.display();

    if report.writes.is_empty() {
        println!("{prefix}✓ '{target}' — nothing to do");
        return;
    }

    let written = report.writes.len() - report.unchanged();
    println!(
        "{prefix}✓ '{target}' rendered ({written} written, {} unchanged)",
        report.unchanged()
    );

    for r in &report.writes {
        match r {
            WriteResult::Written { path } => println!("  ✎  {}", path.display()),
            WriteResult::WouldWrite { path } => println!("  ~  {}", path.display()),
            WriteResult::Unchanged { path } => println!("  ·  {}", path.display()),
        }
    }
}
