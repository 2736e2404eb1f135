//! Incremental discovery of distinct faces across a growing photo collection.
//!
//! # Architecture
//!
//! Each image flows through four stages:
//!
//! 1. [`FaceDetector::detect`]: image bytes -> face crops (external)
//! 2. [`FaceEmbedder::embed`]: face crop -> embedding vector (external)
//! 3. [`Session`]: near-duplicate gate + append-only store of distinct faces
//! 4. cluster + persist: k-means over the session snapshot, then one
//!    representative face written per cluster id that has no record yet
//!
//! Detector and model failures are absorbed per image. Storage failures are
//! reported per cluster id in the [`ClusterRun`] and retried on the next
//! trigger.
//!
//! # Cluster ids
//!
//! Ids are assigned per clustering run from randomly initialized centroids.
//! A record persisted under id 2 today may depict a different person than
//! the cluster labelled 2 tomorrow; the persistence gate only guarantees one
//! write per id.

mod config;
mod error;
mod model;
mod pipeline;
mod session;

pub use config::PipelineConfig;
pub use error::{DetectorError, ModelError, PipelineError};
pub use model::{BoundingBox, DetectedFace, FaceDetector, FaceEmbedder};
pub use pipeline::{ClusterRun, FaceOutcome, ImageOutcome, ImageStatus, Pipeline};
pub use session::Session;

pub use facegroup_faceid::{Admission, FaceEmbedding, RetainedFace};
pub use facegroup_facestore::{FaceRecord, FaceRecordStore, ImageLedger, PersistReport};
