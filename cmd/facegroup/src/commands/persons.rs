//! Persons command.

use std::path::Path;

use clap::Args;
use facegroup_pipeline::FaceRecordStore;
use serde::Serialize;

use super::{get_config, guess_extension, open_store, output_result, print_success};
use crate::Cli;

/// List (and optionally export) the persisted persons
#[derive(Args)]
pub struct PersonsCommand {
    /// Write each representative face into this directory
    #[arg(long)]
    export: Option<String>,
}

#[derive(Serialize)]
struct PersonEntry {
    cluster_id: u32,
    bytes: usize,
    inserted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
}

impl PersonsCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let store = open_store(cli, &cfg)?;
        let records = store.load_all()?;

        if let Some(dir) = &self.export {
            std::fs::create_dir_all(dir)?;
        }

        let mut entries = Vec::with_capacity(records.len());
        for record in &records {
            let file = match &self.export {
                Some(dir) => {
                    let name = format!("person-{}.{}", record.cluster_id, guess_extension(&record.image));
                    let path = Path::new(dir).join(name);
                    std::fs::write(&path, &record.image)?;
                    Some(path.display().to_string())
                }
                None => None,
            };
            entries.push(PersonEntry {
                cluster_id: record.cluster_id,
                bytes: record.image.len(),
                inserted_at: record.inserted_at.to_rfc3339(),
                file,
            });
        }

        output_result(&entries, cli.json)?;
        if let Some(dir) = &self.export {
            print_success(&format!("Exported {} persons to {}", entries.len(), dir));
        }
        Ok(())
    }
}
