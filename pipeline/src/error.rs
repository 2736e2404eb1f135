use facegroup_faceid::FaceIdError;
use facegroup_facestore::StoreError;
use thiserror::Error;

/// Failure of the external embedding model for one face.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model: inference failed: {0}")]
    Inference(String),

    #[error("model: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("model: invalid embedding: {0}")]
    Invalid(String),
}

/// Failure of the external face detector for one image.
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector: cannot decode image: {0}")]
    Decode(String),

    #[error("detector: {0}")]
    Detection(String),
}

/// Errors returned by pipeline construction and storage reads.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline: invalid config: {0}")]
    InvalidConfig(String),

    #[error("pipeline: embedder dimension mismatch: config={config}, embedder={embedder}")]
    EmbedderDimensionMismatch { config: usize, embedder: usize },

    #[error("pipeline: {0}")]
    FaceId(#[from] FaceIdError),

    #[error("pipeline: {0}")]
    Store(#[from] StoreError),
}
