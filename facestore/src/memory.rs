//! In-memory face storage for tests and ephemeral sessions.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::storage;
use crate::{FaceRecord, FaceRecordStore, ImageLedger, StoreError, StoreResult};

/// Face records and image ledger kept in process memory.
///
/// Clones share the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<BTreeMap<u32, FaceRecord>>>,
    images: Arc<Mutex<HashMap<String, bool>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FaceRecordStore for MemoryStore {
    fn exists(&self, cluster_id: u32) -> StoreResult<bool> {
        let records = self.records.lock().map_err(storage)?;
        Ok(records.contains_key(&cluster_id))
    }

    fn insert(&self, cluster_id: u32, image: &Bytes) -> StoreResult<()> {
        let mut records = self.records.lock().map_err(storage)?;
        if records.contains_key(&cluster_id) {
            return Err(StoreError::Conflict(cluster_id));
        }
        records.insert(cluster_id, FaceRecord::new(cluster_id, image.clone()));
        Ok(())
    }

    fn load_all(&self) -> StoreResult<Vec<FaceRecord>> {
        let records = self.records.lock().map_err(storage)?;
        Ok(records.values().cloned().collect())
    }

    fn clear(&self) -> StoreResult<()> {
        self.records.lock().map_err(storage)?.clear();
        Ok(())
    }
}

impl ImageLedger for MemoryStore {
    fn status(&self, image_ref: &str) -> StoreResult<Option<bool>> {
        let images = self.images.lock().map_err(storage)?;
        Ok(images.get(image_ref).copied())
    }

    fn mark(&self, image_ref: &str, had_face: bool) -> StoreResult<()> {
        let mut images = self.images.lock().map_err(storage)?;
        images.insert(image_ref.to_string(), had_face);
        Ok(())
    }

    fn images_with_faces(&self) -> StoreResult<Vec<String>> {
        let images = self.images.lock().map_err(storage)?;
        let mut refs: Vec<String> = images
            .iter()
            .filter(|(_, had_face)| **had_face)
            .map(|(r, _)| r.clone())
            .collect();
        refs.sort();
        Ok(refs)
    }

    fn reset(&self) -> StoreResult<()> {
        self.images.lock().map_err(storage)?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_exists() {
        let store = MemoryStore::new();
        assert!(!store.exists(3).unwrap());

        store.insert(3, &Bytes::from_static(b"face")).unwrap();
        assert!(store.exists(3).unwrap());
        assert!(!store.exists(4).unwrap());
    }

    #[test]
    fn insert_never_overwrites() {
        let store = MemoryStore::new();
        store.insert(1, &Bytes::from_static(b"first")).unwrap();
        let err = store.insert(1, &Bytes::from_static(b"second")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(1)));

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].image, Bytes::from_static(b"first"));
    }

    #[test]
    fn load_all_ordered_by_cluster() {
        let store = MemoryStore::new();
        for id in [4, 0, 2] {
            store.insert(id, &Bytes::from(vec![id as u8])).unwrap();
        }
        let ids: Vec<u32> = store.load_all().unwrap().iter().map(|r| r.cluster_id).collect();
        assert_eq!(ids, vec![0, 2, 4]);

        store.clear().unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn ledger_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.status("a.jpg").unwrap(), None);

        store.mark("b.jpg", true).unwrap();
        store.mark("a.jpg", false).unwrap();
        store.mark("c.jpg", true).unwrap();
        assert_eq!(store.status("a.jpg").unwrap(), Some(false));
        assert_eq!(store.images_with_faces().unwrap(), vec!["b.jpg", "c.jpg"]);

        store.reset().unwrap();
        assert_eq!(store.status("b.jpg").unwrap(), None);
    }

    #[test]
    fn clones_share_state() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.insert(7, &Bytes::new()).unwrap();
        assert!(b.exists(7).unwrap());
    }
}
