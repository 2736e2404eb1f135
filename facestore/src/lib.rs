//! Storage for the representative face of each cluster.
//!
//! [`FaceRecordStore`] is the persistence collaborator of the pipeline: it
//! answers "does a record for this cluster id exist" and inserts new ones.
//! [`ImageLedger`] remembers which gallery images were already processed so
//! a growing collection is never scanned twice. Both traits have an
//! in-memory implementation for tests and a redb-backed one for real use.
//!
//! [`persist`] is the gate in front of the store: it writes each cluster's
//! representative at most once.

mod error;
pub mod memory;
pub mod persist;
pub mod redb;

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use persist::{PersistReport, persist, persist_with};
pub use self::redb::RedbStore;

/// One persisted representative face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub cluster_id: u32,
    pub image: Bytes,
    pub inserted_at: DateTime<Utc>,
}

impl FaceRecord {
    pub fn new(cluster_id: u32, image: Bytes) -> Self {
        Self {
            cluster_id,
            image,
            inserted_at: Utc::now(),
        }
    }
}

/// Persistence of representative faces keyed by cluster id.
pub trait FaceRecordStore: Send + Sync {
    /// Reports whether a record exists for `cluster_id`.
    fn exists(&self, cluster_id: u32) -> StoreResult<bool>;

    /// Stores a new record. Fails with [`StoreError::Conflict`] if one
    /// already exists; records are never overwritten.
    fn insert(&self, cluster_id: u32, image: &Bytes) -> StoreResult<()>;

    /// Returns every record, ordered by cluster id.
    fn load_all(&self) -> StoreResult<Vec<FaceRecord>>;

    /// Removes every record.
    fn clear(&self) -> StoreResult<()>;
}

/// Tracks which images have been through face detection.
pub trait ImageLedger: Send + Sync {
    /// `Some(had_face)` for a processed image, `None` if never seen.
    fn status(&self, image_ref: &str) -> StoreResult<Option<bool>>;

    /// Records the detection outcome of an image.
    fn mark(&self, image_ref: &str, had_face: bool) -> StoreResult<()>;

    /// Refs of processed images that contained at least one face, sorted.
    fn images_with_faces(&self) -> StoreResult<Vec<String>>;

    /// Forgets every processed image.
    fn reset(&self) -> StoreResult<()>;
}

impl fmt::Debug for dyn FaceRecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FaceRecordStore {{ ... }}")
    }
}

impl fmt::Debug for dyn ImageLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageLedger {{ ... }}")
    }
}
