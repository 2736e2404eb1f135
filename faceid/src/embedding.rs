use std::fmt;
use std::sync::Arc;

/// An immutable face signature produced by an external embedding model.
///
/// Cloning is cheap: the values are shared. Equality is structural, but the
/// store treats every admitted embedding as a distinct entry.
#[derive(Clone, PartialEq)]
pub struct FaceEmbedding {
    values: Arc<[f32]>,
}

impl FaceEmbedding {
    /// Returns the vector components.
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Returns the dimensionality of the embedding.
    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean norm, accumulated in f64.
    pub fn norm(&self) -> f64 {
        self.values
            .iter()
            .map(|&x| (x as f64) * (x as f64))
            .sum::<f64>()
            .sqrt()
    }

    /// True when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|x| x.is_finite())
    }
}

impl From<Vec<f32>> for FaceEmbedding {
    fn from(v: Vec<f32>) -> Self {
        Self { values: v.into() }
    }
}

impl From<&[f32]> for FaceEmbedding {
    fn from(v: &[f32]) -> Self {
        Self { values: v.into() }
    }
}

impl AsRef<[f32]> for FaceEmbedding {
    fn as_ref(&self) -> &[f32] {
        &self.values
    }
}

impl fmt::Debug for FaceEmbedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceEmbedding")
            .field("dim", &self.values.len())
            .field("norm", &self.norm())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_and_dim() {
        let e = FaceEmbedding::from(vec![3.0, 4.0]);
        assert_eq!(e.dim(), 2);
        assert!((e.norm() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn clones_share_values() {
        let a = FaceEmbedding::from(vec![1.0, 2.0, 3.0]);
        let b = a.clone();
        assert_eq!(a, b);
        assert!(std::ptr::eq(a.as_slice().as_ptr(), b.as_slice().as_ptr()));
    }

    #[test]
    fn non_finite_detected() {
        assert!(FaceEmbedding::from(vec![1.0, 0.0]).is_finite());
        assert!(!FaceEmbedding::from(vec![f32::NAN, 0.0]).is_finite());
        assert!(!FaceEmbedding::from(vec![f32::INFINITY]).is_finite());
    }
}
