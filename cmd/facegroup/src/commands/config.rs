//! Config command.

use clap::Args;
use facegroup_pipeline::PipelineConfig;
use serde::Serialize;

use super::{get_config, output_result};
use crate::Cli;

/// Print the effective configuration
#[derive(Args)]
pub struct ConfigCommand {
    /// Only print the config file path
    #[arg(long)]
    path: bool,
}

#[derive(Serialize)]
struct EffectiveConfig {
    config_file: String,
    db: String,
    pipeline: PipelineConfig,
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        if self.path {
            println!("{}", cfg.path().display());
            return Ok(());
        }

        let effective = EffectiveConfig {
            config_file: cfg.path().display().to_string(),
            db: cfg.db_path(cli.db.as_deref())?.display().to_string(),
            pipeline: cfg.pipeline.clone(),
        };
        output_result(&effective, cli.json)
    }
}
