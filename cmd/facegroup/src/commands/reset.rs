//! Reset command.

use clap::Args;
use facegroup_pipeline::{FaceRecordStore, ImageLedger};
use tracing::info;

use super::{get_config, open_store, print_success};
use crate::Cli;

/// Delete every persisted person and forget processed images
#[derive(Args)]
pub struct ResetCommand {
    /// Keep the processed-image ledger
    #[arg(long)]
    keep_ledger: bool,
}

impl ResetCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let store = open_store(cli, &cfg)?;

        let removed = store.load_all()?.len();
        store.clear()?;
        if !self.keep_ledger {
            store.reset()?;
        }
        info!(removed, keep_ledger = self.keep_ledger, "database reset");
        print_success(&format!("Removed {} persons", removed));
        Ok(())
    }
}
