use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{DetectorError, ModelError};

/// Face location within the source image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// One face found by a [`FaceDetector`].
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    /// Encoded crop of the face. This is what gets embedded and, if the face
    /// ends up representing a cluster, persisted.
    pub image: Bytes,
}

/// Locates faces in an encoded image.
///
/// Implementations must be safe for concurrent use and must eventually
/// return; callers wrapping a slow backend should bound each call.
pub trait FaceDetector: Send + Sync {
    /// Returns every face in `image`, possibly none.
    fn detect(&self, image: &[u8]) -> Result<Vec<DetectedFace>, DetectorError>;
}

/// Turns a face crop into a fixed-length embedding vector.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait FaceEmbedder: Send + Sync {
    /// Computes the embedding of one face crop.
    fn embed(&self, face: &[u8]) -> Result<Vec<f32>, ModelError>;

    /// Returns the dimensionality of the embedding vectors (e.g. 128 or 512).
    fn dimension(&self) -> usize;
}
