//! Manifest files of precomputed detections.
//!
//! A manifest stands in for a real detector and embedding model:
//!
//! ```yaml
//! dim: 2
//! images:
//!   - ref: beach.jpg
//!     faces:
//!       - bbox: { left: 10, top: 20, width: 64, height: 64 }
//!         crop: crops/beach-0.png
//!         embedding: [0.12, 0.98]
//!   - ref: broken.jpg
//!     error: cannot decode
//! ```
//!
//! Crop paths are relative to the manifest file. The embedder sees only crop
//! bytes, so faces whose crops are byte-identical must declare the same
//! embedding; loading fails otherwise.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;
use bytes::Bytes;
use facegroup_pipeline::{BoundingBox, DetectedFace, DetectorError, FaceDetector, FaceEmbedder, ModelError};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    /// Embedding dimension the "model" advertises. Defaults to the length of
    /// the first embedding of an image without `error`.
    #[serde(default)]
    pub dim: Option<usize>,

    #[serde(default)]
    pub images: Vec<ManifestImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestImage {
    #[serde(rename = "ref")]
    pub image_ref: String,

    /// Simulated detector failure.
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub faces: Vec<ManifestFace>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestFace {
    #[serde(default)]
    pub bbox: BoundingBox,

    /// Face crop file. Without one, a placeholder derived from the image ref
    /// stands in for the crop bytes.
    #[serde(default)]
    pub crop: Option<String>,

    pub embedding: Vec<f32>,
}

impl Manifest {
    /// Loads a manifest from a YAML or JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("yaml");
        let manifest = match ext.to_lowercase().as_str() {
            "json" => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        Ok(manifest)
    }

    /// Advertised embedding dimension, if any can be derived.
    pub fn dimension(&self) -> Option<usize> {
        self.dim.or_else(|| {
            self.images
                .iter()
                .filter(|img| img.error.is_none())
                .flat_map(|img| img.faces.first())
                .map(|f| f.embedding.len())
                .next()
        })
    }
}

/// Detector and embedder backed by a loaded manifest.
///
/// The "image bytes" handed to [`FaceDetector::detect`] are the image ref;
/// crops are matched to embeddings by content.
#[derive(Debug, Default)]
pub struct ManifestModel {
    detections: HashMap<String, Result<Vec<DetectedFace>, String>>,
    embeddings: HashMap<Bytes, Vec<f32>>,
    dim: usize,
}

impl ManifestModel {
    /// Reads every crop referenced by `manifest`. `base` is the directory
    /// crop paths are relative to; `fallback_dim` applies when the manifest
    /// has no faces to derive a dimension from.
    pub fn load(manifest: &Manifest, base: &Path, fallback_dim: usize) -> anyhow::Result<Self> {
        let mut model = Self {
            dim: manifest.dimension().unwrap_or(fallback_dim),
            ..Default::default()
        };

        for image in &manifest.images {
            if let Some(err) = &image.error {
                model.detections.insert(image.image_ref.clone(), Err(err.clone()));
                continue;
            }
            let mut faces = Vec::with_capacity(image.faces.len());
            for (i, face) in image.faces.iter().enumerate() {
                let crop = match &face.crop {
                    Some(p) => {
                        let path = base.join(p);
                        let data = std::fs::read(&path)
                            .with_context(|| format!("reading crop {}", path.display()))?;
                        Bytes::from(data)
                    }
                    None => Bytes::from(format!("{}#{}", image.image_ref, i)),
                };
                match model.embeddings.get(&crop) {
                    Some(known) if *known != face.embedding => anyhow::bail!(
                        "{} face {}: crop bytes already declared with a different embedding",
                        image.image_ref,
                        i
                    ),
                    Some(_) => {}
                    None => {
                        model.embeddings.insert(crop.clone(), face.embedding.clone());
                    }
                }
                faces.push(DetectedFace {
                    bbox: face.bbox,
                    image: crop,
                });
            }
            model.detections.insert(image.image_ref.clone(), Ok(faces));
        }
        Ok(model)
    }
}

impl FaceDetector for ManifestModel {
    fn detect(&self, image: &[u8]) -> Result<Vec<DetectedFace>, DetectorError> {
        let image_ref = std::str::from_utf8(image).map_err(|e| DetectorError::Decode(e.to_string()))?;
        match self.detections.get(image_ref) {
            Some(Ok(faces)) => Ok(faces.clone()),
            Some(Err(msg)) => Err(DetectorError::Detection(msg.clone())),
            None => Err(DetectorError::Decode(format!("unknown image {image_ref}"))),
        }
    }
}

impl FaceEmbedder for ManifestModel {
    fn embed(&self, face: &[u8]) -> Result<Vec<f32>, ModelError> {
        self.embeddings
            .get(face)
            .cloned()
            .ok_or_else(|| ModelError::Inference("no embedding for crop".into()))
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}
