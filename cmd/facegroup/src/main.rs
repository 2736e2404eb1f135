//! facegroup - discover the distinct people in a photo collection.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod manifest;

use commands::{ConfigCommand, IngestCommand, PersonsCommand, ResetCommand};

/// facegroup - discover the distinct people in a photo collection.
///
/// Images are read from manifest files carrying precomputed face detections
/// and embeddings. Distinct faces are clustered and one representative face
/// per cluster is stored in a local database.
///
/// Configuration is stored in ~/.facegroup/config.yaml.
#[derive(Parser)]
#[command(name = "facegroup")]
#[command(about = "Incremental face deduplication and grouping")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.facegroup/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Database file (default is ~/.facegroup/data/faces.redb)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Feed the images of a manifest through the pipeline
    Ingest(IngestCommand),
    /// List (and optionally export) the persisted persons
    Persons(PersonsCommand),
    /// Delete every persisted person and forget processed images
    Reset(ResetCommand),
    /// Print the effective configuration
    Config(ConfigCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Ingest(cmd) => cmd.run(&cli),
        Commands::Persons(cmd) => cmd.run(&cli),
        Commands::Reset(cmd) => cmd.run(&cli),
        Commands::Config(cmd) => cmd.run(&cli),
    }
}
