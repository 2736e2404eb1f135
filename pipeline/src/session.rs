use std::fmt;

use bytes::Bytes;
use facegroup_faceid::{Admission, EmbeddingStore, FaceEmbedding, FaceIdError, RetainedFace};
use parking_lot::Mutex;
use uuid::Uuid;

/// Scope of one processing run: the distinct faces seen so far and the
/// clustering cadence counters.
///
/// Created by [`crate::Pipeline::new_session`] and passed to every pipeline
/// call. Nothing is shared between sessions; [`Session::reset`] starts over.
pub struct Session {
    id: Uuid,
    threshold: f32,
    store: EmbeddingStore,
    counters: Mutex<Counters>,
}

#[derive(Default)]
struct Counters {
    processed: u64,
    since_cluster: u32,
}

impl Session {
    pub(crate) fn new(dim: usize, threshold: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            threshold,
            store: EmbeddingStore::new(dim),
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Gate + admit as one atomic step.
    pub fn offer(&self, embedding: FaceEmbedding, image: Bytes) -> Result<Admission, FaceIdError> {
        self.store.admit_if_new(embedding, image, self.threshold)
    }

    /// Copy of the retained faces at this instant.
    pub fn snapshot(&self) -> Vec<RetainedFace> {
        self.store.snapshot()
    }

    /// Number of distinct faces retained.
    pub fn retained(&self) -> usize {
        self.store.len()
    }

    /// Number of images that went through detection in this session.
    pub fn processed_images(&self) -> u64 {
        self.counters.lock().processed
    }

    /// Counts a processed image; returns true when clustering is due.
    pub(crate) fn record_image(&self, admitted_any: bool, cluster_every: u32) -> bool {
        let mut c = self.counters.lock();
        c.processed += 1;
        if !admitted_any {
            return false;
        }
        c.since_cluster += 1;
        if c.since_cluster >= cluster_every {
            c.since_cluster = 0;
            return true;
        }
        false
    }

    /// Forgets every retained face and resets the counters.
    pub fn reset(&self) {
        let mut c = self.counters.lock();
        self.store.clear();
        *c = Counters::default();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("retained", &self.retained())
            .field("processed", &self.processed_images())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_every_third_admitting_image() {
        let s = Session::new(2, 0.6);
        let due: Vec<bool> = [true, false, true, true, true, true, true]
            .iter()
            .map(|&admitted| s.record_image(admitted, 3))
            .collect();
        assert_eq!(due, vec![false, false, false, true, false, false, true]);
        assert_eq!(s.processed_images(), 7);
    }

    #[test]
    fn reset_clears_faces_and_counters() {
        let s = Session::new(2, 0.6);
        s.offer(FaceEmbedding::from(vec![1.0, 0.0]), Bytes::new()).unwrap();
        s.record_image(true, 5);
        s.reset();
        assert_eq!(s.retained(), 0);
        assert_eq!(s.processed_images(), 0);
        // counter restarted: needs a full cadence again
        assert!(!s.record_image(true, 2));
        assert!(s.record_image(true, 2));
    }

    #[test]
    fn offer_uses_session_threshold() {
        let strict = Session::new(2, 0.99);
        strict.offer(FaceEmbedding::from(vec![1.0, 0.0]), Bytes::new()).unwrap();
        let a = strict.offer(FaceEmbedding::from(vec![0.95, 0.3]), Bytes::new()).unwrap();
        assert!(a.is_admitted());

        let lenient = Session::new(2, 0.5);
        lenient.offer(FaceEmbedding::from(vec![1.0, 0.0]), Bytes::new()).unwrap();
        let a = lenient.offer(FaceEmbedding::from(vec![0.95, 0.3]), Bytes::new()).unwrap();
        assert_eq!(a, Admission::Rejected);
    }
}
