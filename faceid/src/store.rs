use bytes::Bytes;
use parking_lot::Mutex;

use crate::FaceIdError;
use crate::embedding::FaceEmbedding;
use crate::similarity::is_new_face;

/// An admitted embedding together with its representative face image.
#[derive(Debug, Clone)]
pub struct RetainedFace {
    /// Admission order within the store, starting at 1.
    pub seq: u64,
    pub embedding: FaceEmbedding,
    pub image: Bytes,
}

impl AsRef<[f32]> for RetainedFace {
    fn as_ref(&self) -> &[f32] {
        self.embedding.as_slice()
    }
}

/// Result of offering a candidate to [`EmbeddingStore::admit_if_new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The face was new and has been appended under `seq`.
    Admitted { seq: u64 },
    /// The face was judged a duplicate of an already retained face.
    Rejected,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

/// Append-only working set of distinct faces for one processing session.
///
/// Safe for concurrent use. Entries are never removed individually; the
/// whole set is dropped with [`EmbeddingStore::clear`] at a session
/// boundary.
pub struct EmbeddingStore {
    dim: usize,
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    faces: Vec<RetainedFace>,
    seq: u64,
}

impl StoreInner {
    fn push(&mut self, embedding: FaceEmbedding, image: Bytes) -> u64 {
        self.seq += 1;
        self.faces.push(RetainedFace {
            seq: self.seq,
            embedding,
            image,
        });
        self.seq
    }
}

impl EmbeddingStore {
    /// Creates an empty store for embeddings of dimension `dim`.
    /// Panics if `dim` is 0.
    pub fn new(dim: usize) -> Self {
        assert!(dim > 0, "faceid: EmbeddingStore dim must be positive");
        Self {
            dim,
            inner: Mutex::new(StoreInner {
                faces: Vec::new(),
                seq: 0,
            }),
        }
    }

    /// Returns the embedding dimension accepted by this store.
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn check(&self, embedding: &FaceEmbedding) -> Result<(), FaceIdError> {
        if embedding.dim() != self.dim {
            return Err(FaceIdError::DimensionMismatch {
                expected: self.dim,
                got: embedding.dim(),
            });
        }
        if !embedding.is_finite() {
            return Err(FaceIdError::NonFinite);
        }
        Ok(())
    }

    /// Appends unconditionally. Callers are expected to have run the
    /// similarity gate already; prefer [`EmbeddingStore::admit_if_new`].
    pub fn admit(&self, embedding: FaceEmbedding, image: Bytes) -> Result<u64, FaceIdError> {
        self.check(&embedding)?;
        Ok(self.inner.lock().push(embedding, image))
    }

    /// Runs the similarity gate against every retained face and appends the
    /// candidate if it is new, all under a single lock acquisition.
    pub fn admit_if_new(
        &self,
        embedding: FaceEmbedding,
        image: Bytes,
        threshold: f32,
    ) -> Result<Admission, FaceIdError> {
        self.check(&embedding)?;
        let mut inner = self.inner.lock();
        if !is_new_face(embedding.as_slice(), &inner.faces, threshold) {
            return Ok(Admission::Rejected);
        }
        let seq = inner.push(embedding, image);
        Ok(Admission::Admitted { seq })
    }

    /// Returns a copy of all retained faces in admission order.
    ///
    /// The copy is taken at one instant; later admissions do not show up in
    /// it.
    pub fn snapshot(&self) -> Vec<RetainedFace> {
        self.inner.lock().faces.clone()
    }

    /// Returns the number of retained faces.
    pub fn len(&self) -> usize {
        self.inner.lock().faces.len()
    }

    /// Returns true if nothing has been admitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every retained face and restarts the sequence.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.faces.clear();
        inner.seq = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn emb(v: &[f32]) -> FaceEmbedding {
        FaceEmbedding::from(v)
    }

    #[test]
    fn admit_and_snapshot() {
        let store = EmbeddingStore::new(3);
        let s1 = store.admit(emb(&[1.0, 2.0, 3.0]), Bytes::from_static(b"a")).unwrap();
        let s2 = store.admit(emb(&[1.0, 2.0, 3.0]), Bytes::from_static(b"b")).unwrap();
        assert_eq!((s1, s2), (1, 2));

        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].image, Bytes::from_static(b"a"));
        assert_eq!(snap[1].seq, 2);
    }

    #[test]
    fn rejects_wrong_dimension() {
        let store = EmbeddingStore::new(3);
        let err = store.admit(emb(&[1.0, 2.0]), Bytes::new()).unwrap_err();
        assert!(matches!(
            err,
            FaceIdError::DimensionMismatch { expected: 3, got: 2 }
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn rejects_non_finite() {
        let store = EmbeddingStore::new(2);
        let err = store
            .admit_if_new(emb(&[f32::NAN, 1.0]), Bytes::new(), 0.6)
            .unwrap_err();
        assert!(matches!(err, FaceIdError::NonFinite));
    }

    #[test]
    fn admit_if_new_filters_duplicates() {
        let store = EmbeddingStore::new(2);
        let inputs: [[f32; 2]; 4] = [[1.0, 0.0], [0.99, 0.1], [-1.0, 0.0], [-0.98, -0.05]];
        let decisions: Vec<bool> = inputs
            .iter()
            .map(|v| {
                store
                    .admit_if_new(emb(v), Bytes::new(), 0.8)
                    .unwrap()
                    .is_admitted()
            })
            .collect();
        assert_eq!(decisions, vec![true, false, true, false]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn snapshot_is_stable() {
        let store = EmbeddingStore::new(2);
        store.admit(emb(&[1.0, 0.0]), Bytes::new()).unwrap();
        let snap = store.snapshot();
        store.admit(emb(&[0.0, 1.0]), Bytes::new()).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn clear_resets_sequence() {
        let store = EmbeddingStore::new(1);
        store.admit(emb(&[1.0]), Bytes::new()).unwrap();
        store.admit(emb(&[2.0]), Bytes::new()).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.admit(emb(&[3.0]), Bytes::new()).unwrap(), 1);
    }

    #[test]
    fn concurrent_duplicates_admitted_once() {
        let store = Arc::new(EmbeddingStore::new(3));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let jitter = i as f32 * 0.001;
                    store
                        .admit_if_new(emb(&[1.0, jitter, 0.0]), Bytes::new(), 0.9)
                        .unwrap()
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Admission::is_admitted)
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(store.len(), 1);
    }
}
