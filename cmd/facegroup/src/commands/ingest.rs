//! Ingest command.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use facegroup_pipeline::{ClusterRun, ImageOutcome, ImageStatus, Pipeline};
use serde::Serialize;
use tracing::info;

use super::{get_config, open_store, output_result};
use crate::Cli;
use crate::manifest::{Manifest, ManifestModel};

/// Feed the images of a manifest through the pipeline
#[derive(Args)]
pub struct IngestCommand {
    /// Manifest file (YAML or JSON)
    #[arg(short = 'm', long)]
    manifest: String,

    /// Similarity threshold above which a face is a duplicate
    #[arg(long)]
    threshold: Option<f32>,

    /// Maximum number of clusters
    #[arg(short = 'k', long)]
    k: Option<usize>,

    /// Cluster after every n-th image that admitted a new face
    #[arg(long)]
    cluster_every: Option<u32>,

    /// Seed for cluster initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Process images that were already processed before
    #[arg(long)]
    reprocess: bool,

    /// Run one more clustering pass after the last image
    #[arg(long)]
    recluster: bool,
}

#[derive(Debug, Default, Serialize)]
struct IngestSummary {
    session: String,
    images: usize,
    already_processed: usize,
    detector_failures: usize,
    without_faces: usize,
    faces: usize,
    admitted: usize,
    rejected: usize,
    embed_failures: usize,
    retained: usize,
    cluster_runs: usize,
    inserted: Vec<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<FailedInsert>,
}

#[derive(Debug, Serialize)]
struct FailedInsert {
    cluster_id: u32,
    error: String,
}

impl IngestSummary {
    fn add_image(&mut self, out: &ImageOutcome) {
        self.images += 1;
        match out.status {
            ImageStatus::AlreadyProcessed => self.already_processed += 1,
            ImageStatus::DetectorFailed => self.detector_failures += 1,
            ImageStatus::NoFaces => self.without_faces += 1,
            ImageStatus::Processed => {}
        }
        self.faces += out.faces.len();
        self.admitted += out.admitted();
        self.rejected += out.rejected();
        self.embed_failures += out.embed_failures();
        if let Some(run) = &out.cluster_run {
            self.add_run(run);
        }
    }

    fn add_run(&mut self, run: &ClusterRun) {
        self.cluster_runs += 1;
        self.inserted.extend(&run.persist.inserted);
        self.failed.extend(run.persist.failed.iter().map(|(id, e)| FailedInsert {
            cluster_id: *id,
            error: e.to_string(),
        }));
    }
}

impl IngestCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;

        let mut pcfg = cfg.pipeline.clone();
        if let Some(t) = self.threshold {
            pcfg.threshold = t;
        }
        if let Some(k) = self.k {
            pcfg.k = k;
        }
        if let Some(n) = self.cluster_every {
            pcfg.cluster_every = n;
        }
        if self.seed.is_some() {
            pcfg.seed = self.seed;
        }
        if self.reprocess {
            pcfg.skip_seen_images = false;
        }

        let manifest_path = Path::new(&self.manifest);
        let manifest = Manifest::load(manifest_path)?;
        let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        let model = Arc::new(ManifestModel::load(&manifest, base, pcfg.dim)?);

        let store = open_store(cli, &cfg)?;
        let pipeline = Pipeline::new(pcfg, model.clone(), model, store.clone())?.with_ledger(store);
        let session = pipeline.new_session();
        info!(
            session = %session.id(),
            images = manifest.images.len(),
            threshold = pipeline.config().threshold,
            k = pipeline.config().k,
            "ingest started"
        );

        let mut summary = IngestSummary {
            session: session.id().to_string(),
            ..Default::default()
        };
        for image in &manifest.images {
            let out = pipeline.process_image(&session, &image.image_ref, image.image_ref.as_bytes());
            summary.add_image(&out);
        }
        if self.recluster && session.retained() > 0 {
            summary.add_run(&pipeline.recluster(&session));
        }
        summary.retained = session.retained();

        info!(
            images = summary.images,
            retained = summary.retained,
            inserted = summary.inserted.len(),
            "ingest finished"
        );
        output_result(&summary, cli.json)
    }
}
