use facegroup_faceid::DEFAULT_THRESHOLD;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Controls pipeline behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Embedding dimension produced by the face model (e.g. 128 or 512).
    pub dim: usize,

    /// Cosine similarity above which a face is a duplicate of a retained one.
    /// Higher = stricter (more distinct faces kept). Default: 0.6.
    pub threshold: f32,

    /// Upper bound on the number of clusters per run. Default: 5.
    pub k: usize,

    /// Maximum k-means rounds per run. Default: 100.
    pub max_iterations: usize,

    /// Cluster after every n-th image that admitted at least one new face.
    /// Default: 1.
    pub cluster_every: u32,

    /// Seed for centroid initialization. `None` draws fresh entropy per run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Skip images the ledger has already seen. Default: true.
    pub skip_seen_images: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dim: 512,
            threshold: DEFAULT_THRESHOLD,
            k: 5,
            max_iterations: 100,
            cluster_every: 1,
            seed: None,
            skip_seen_images: true,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.dim == 0 {
            return Err(PipelineError::InvalidConfig("dim must be positive".into()));
        }
        if !self.threshold.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        if self.max_iterations == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_iterations must be positive".into(),
            ));
        }
        if self.cluster_every == 0 {
            return Err(PipelineError::InvalidConfig(
                "cluster_every must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.dim, 512);
        assert!((cfg.threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(cfg.k, 5);
        assert_eq!(cfg.max_iterations, 100);
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg: PipelineConfig = serde_yaml::from_str("dim: 128\nthreshold: 0.75\nseed: 7\n").unwrap();
        assert_eq!(cfg.dim, 128);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.k, 5);
        assert!(cfg.skip_seen_images);
    }

    #[test]
    fn rejects_invalid() {
        let bad = [
            PipelineConfig { dim: 0, ..Default::default() },
            PipelineConfig { threshold: f32::NAN, ..Default::default() },
            PipelineConfig { max_iterations: 0, ..Default::default() },
            PipelineConfig { cluster_every: 0, ..Default::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(PipelineError::InvalidConfig(_))), "{cfg:?}");
        }
    }
}
