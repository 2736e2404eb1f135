use std::fmt;
use std::sync::Arc;

use facegroup_faceid::{Admission, ClusterEngine, FaceEmbedding};
use facegroup_facestore::{FaceRecord, FaceRecordStore, ImageLedger, PersistReport, persist};
use parking_lot::Mutex;
use tracing::{debug, info, info_span, warn};

use crate::config::PipelineConfig;
use crate::error::{ModelError, PipelineError};
use crate::model::{DetectedFace, FaceDetector, FaceEmbedder};
use crate::session::Session;

/// What happened to one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    /// The ledger already had this image; nothing was done.
    AlreadyProcessed,
    /// The detector failed; the image counts as having no faces.
    DetectorFailed,
    /// No face was detected.
    NoFaces,
    /// At least one face was detected and offered to the gate.
    Processed,
}

/// What happened to one detected face.
#[derive(Debug)]
pub enum FaceOutcome {
    Admitted { seq: u64 },
    Rejected,
    EmbedFailed(ModelError),
}

/// Result of one clustering + persistence run.
#[derive(Debug)]
pub struct ClusterRun {
    /// Faces in the snapshot that was clustered.
    pub points: usize,
    /// Non-empty clusters found.
    pub clusters: usize,
    pub iterations: usize,
    pub converged: bool,
    pub persist: PersistReport,
}

/// Result of [`Pipeline::process_image`].
#[derive(Debug)]
pub struct ImageOutcome {
    pub image_ref: String,
    pub status: ImageStatus,
    pub faces: Vec<FaceOutcome>,
    /// Present when this image triggered clustering.
    pub cluster_run: Option<ClusterRun>,
}

impl ImageOutcome {
    fn new(image_ref: &str, status: ImageStatus) -> Self {
        Self {
            image_ref: image_ref.to_string(),
            status,
            faces: Vec::new(),
            cluster_run: None,
        }
    }

    pub fn admitted(&self) -> usize {
        self.faces
            .iter()
            .filter(|f| matches!(f, FaceOutcome::Admitted { .. }))
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.faces
            .iter()
            .filter(|f| matches!(f, FaceOutcome::Rejected))
            .count()
    }

    pub fn embed_failures(&self) -> usize {
        self.faces
            .iter()
            .filter(|f| matches!(f, FaceOutcome::EmbedFailed(_)))
            .count()
    }
}

/// Wires detection, embedding, deduplication, clustering and persistence.
///
/// The pipeline owns its collaborators; per-run state lives in a
/// [`Session`]. Safe to share across threads.
pub struct Pipeline {
    cfg: PipelineConfig,
    detector: Arc<dyn FaceDetector>,
    embedder: Arc<dyn FaceEmbedder>,
    records: Arc<dyn FaceRecordStore>,
    ledger: Option<Arc<dyn ImageLedger>>,
    engine: ClusterEngine,
    cluster_lock: Mutex<()>,
}

impl Pipeline {
    /// Creates a pipeline. Fails if the config is invalid or the embedder's
    /// dimension differs from `cfg.dim`.
    pub fn new(
        cfg: PipelineConfig,
        detector: Arc<dyn FaceDetector>,
        embedder: Arc<dyn FaceEmbedder>,
        records: Arc<dyn FaceRecordStore>,
    ) -> Result<Self, PipelineError> {
        cfg.validate()?;
        if embedder.dimension() != cfg.dim {
            return Err(PipelineError::EmbedderDimensionMismatch {
                config: cfg.dim,
                embedder: embedder.dimension(),
            });
        }
        let mut engine = ClusterEngine::new(cfg.k, cfg.max_iterations);
        if let Some(seed) = cfg.seed {
            engine = engine.with_seed(seed);
        }
        Ok(Self {
            cfg,
            detector,
            embedder,
            records,
            ledger: None,
            engine,
            cluster_lock: Mutex::new(()),
        })
    }

    /// Attaches a ledger of processed images.
    pub fn with_ledger(mut self, ledger: Arc<dyn ImageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Starts a new, empty session.
    pub fn new_session(&self) -> Session {
        Session::new(self.cfg.dim, self.cfg.threshold)
    }

    /// Detects, embeds and deduplicates the faces of one image, then runs
    /// clustering and persistence if the cadence says so.
    ///
    /// Detector and model failures never abort: the image (or face) is
    /// treated as having no faces and processing continues.
    pub fn process_image(&self, session: &Session, image_ref: &str, image: &[u8]) -> ImageOutcome {
        let span = info_span!("image", session = %session.id(), image = image_ref);
        let _guard = span.enter();

        if self.already_seen(image_ref) {
            debug!("pipeline: image already processed, skipping");
            return ImageOutcome::new(image_ref, ImageStatus::AlreadyProcessed);
        }

        match self.detector.detect(image) {
            Ok(faces) => self.handle_faces(session, image_ref, &faces),
            Err(e) => {
                warn!(error = %e, "pipeline: detection failed, treating image as faceless");
                self.mark(image_ref, false);
                session.record_image(false, self.cfg.cluster_every);
                ImageOutcome::new(image_ref, ImageStatus::DetectorFailed)
            }
        }
    }

    /// Like [`Pipeline::process_image`] for callers that ran detection
    /// themselves.
    pub fn process_faces(
        &self,
        session: &Session,
        image_ref: &str,
        faces: &[DetectedFace],
    ) -> ImageOutcome {
        let span = info_span!("image", session = %session.id(), image = image_ref);
        let _guard = span.enter();

        if self.already_seen(image_ref) {
            debug!("pipeline: image already processed, skipping");
            return ImageOutcome::new(image_ref, ImageStatus::AlreadyProcessed);
        }
        self.handle_faces(session, image_ref, faces)
    }

    fn handle_faces(&self, session: &Session, image_ref: &str, faces: &[DetectedFace]) -> ImageOutcome {
        if faces.is_empty() {
            self.mark(image_ref, false);
            session.record_image(false, self.cfg.cluster_every);
            return ImageOutcome::new(image_ref, ImageStatus::NoFaces);
        }

        let mut outcome = ImageOutcome::new(image_ref, ImageStatus::Processed);
        for face in faces {
            outcome.faces.push(self.offer_face(session, face));
        }

        let embedded = outcome.embed_failures() < faces.len();
        self.mark(image_ref, embedded);

        let admitted = outcome.admitted() > 0;
        debug!(
            detected = faces.len(),
            admitted = outcome.admitted(),
            rejected = outcome.rejected(),
            retained = session.retained(),
            "pipeline: faces offered"
        );

        if session.record_image(admitted, self.cfg.cluster_every) {
            outcome.cluster_run = Some(self.recluster(session));
        }
        outcome
    }

    fn offer_face(&self, session: &Session, face: &DetectedFace) -> FaceOutcome {
        let vector = match self.embedder.embed(&face.image) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "pipeline: embedding failed, skipping face");
                return FaceOutcome::EmbedFailed(e);
            }
        };
        if vector.len() != self.cfg.dim {
            let e = ModelError::DimensionMismatch {
                expected: self.cfg.dim,
                got: vector.len(),
            };
            warn!(error = %e, "pipeline: embedding rejected");
            return FaceOutcome::EmbedFailed(e);
        }

        match session.offer(FaceEmbedding::from(vector), face.image.clone()) {
            Ok(Admission::Admitted { seq }) => {
                debug!(seq, "pipeline: new face admitted");
                FaceOutcome::Admitted { seq }
            }
            Ok(Admission::Rejected) => FaceOutcome::Rejected,
            Err(e) => {
                warn!(error = %e, "pipeline: embedding rejected");
                FaceOutcome::EmbedFailed(ModelError::Invalid(e.to_string()))
            }
        }
    }

    /// Clusters the session's current snapshot and persists every new
    /// cluster's representative, regardless of cadence.
    pub fn recluster(&self, session: &Session) -> ClusterRun {
        let _serial = self.cluster_lock.lock();

        let snapshot = session.snapshot();
        let clustering = self.engine.cluster(&snapshot);
        let report = persist(&clustering.representatives(), self.records.as_ref());

        info!(
            points = clustering.points,
            clusters = clustering.len(),
            iterations = clustering.iterations,
            inserted = report.inserted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "pipeline: cluster run finished"
        );

        ClusterRun {
            points: clustering.points,
            clusters: clustering.len(),
            iterations: clustering.iterations,
            converged: clustering.converged,
            persist: report,
        }
    }

    /// Every persisted representative face, ordered by cluster id.
    pub fn persons(&self) -> Result<Vec<FaceRecord>, PipelineError> {
        Ok(self.records.load_all()?)
    }

    /// Refs of processed images that had at least one face. Empty without a
    /// ledger.
    pub fn images_with_faces(&self) -> Result<Vec<String>, PipelineError> {
        match &self.ledger {
            Some(ledger) => Ok(ledger.images_with_faces()?),
            None => Ok(Vec::new()),
        }
    }

    fn already_seen(&self, image_ref: &str) -> bool {
        if !self.cfg.skip_seen_images {
            return false;
        }
        let Some(ledger) = &self.ledger else {
            return false;
        };
        match ledger.status(image_ref) {
            Ok(status) => status.is_some(),
            Err(e) => {
                warn!(error = %e, "pipeline: ledger lookup failed, processing image");
                false
            }
        }
    }

    fn mark(&self, image_ref: &str, had_face: bool) {
        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.mark(image_ref, had_face) {
                warn!(error = %e, "pipeline: failed to record image in ledger");
            }
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("cfg", &self.cfg)
            .field("engine", &self.engine)
            .field("ledger", &self.ledger.is_some())
            .finish_non_exhaustive()
    }
}
