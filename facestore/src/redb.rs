//! Redb-backed persistent face storage.

use std::path::Path;

use bytes::Bytes;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::storage;
use crate::{FaceRecord, FaceRecordStore, ImageLedger, StoreError, StoreResult};

/// cluster id -> msgpack-encoded [`FaceRecord`].
const FACES: TableDefinition<u32, &[u8]> = TableDefinition::new("faces");

/// image ref -> 1 if the image had a face, 0 otherwise.
const IMAGES: TableDefinition<&str, u8> = TableDefinition::new("images");

/// Face records and image ledger persisted in a single redb file.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = Database::create(path.as_ref()).map_err(storage)?;

        // Create both tables so read transactions never miss them.
        let tx = db.begin_write().map_err(storage)?;
        {
            tx.open_table(FACES).map_err(storage)?;
            tx.open_table(IMAGES).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        debug!(path = %path.as_ref().display(), "facestore: opened redb store");
        Ok(Self { db })
    }
}

fn encode(record: &FaceRecord) -> StoreResult<Vec<u8>> {
    rmp_serde::to_vec_named(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode(data: &[u8]) -> StoreResult<FaceRecord> {
    rmp_serde::from_slice(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl FaceRecordStore for RedbStore {
    fn exists(&self, cluster_id: u32) -> StoreResult<bool> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(FACES).map_err(storage)?;
        Ok(table.get(cluster_id).map_err(storage)?.is_some())
    }

    fn insert(&self, cluster_id: u32, image: &Bytes) -> StoreResult<()> {
        let data = encode(&FaceRecord::new(cluster_id, image.clone()))?;
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(FACES).map_err(storage)?;
            if table.get(cluster_id).map_err(storage)?.is_some() {
                return Err(StoreError::Conflict(cluster_id));
            }
            table.insert(cluster_id, data.as_slice()).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }

    fn load_all(&self) -> StoreResult<Vec<FaceRecord>> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(FACES).map_err(storage)?;

        let mut records = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (_, value) = item.map_err(storage)?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }

    fn clear(&self) -> StoreResult<()> {
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(FACES).map_err(storage)?;
            let keys: Vec<u32> = table
                .iter()
                .map_err(storage)?
                .map(|item| item.map(|(k, _)| k.value()))
                .collect::<Result<_, _>>()
                .map_err(storage)?;
            for key in keys {
                table.remove(key).map_err(storage)?;
            }
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }
}

impl ImageLedger for RedbStore {
    fn status(&self, image_ref: &str) -> StoreResult<Option<bool>> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(IMAGES).map_err(storage)?;
        Ok(table
            .get(image_ref)
            .map_err(storage)?
            .map(|v| v.value() != 0))
    }

    fn mark(&self, image_ref: &str, had_face: bool) -> StoreResult<()> {
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(IMAGES).map_err(storage)?;
            table
                .insert(image_ref, u8::from(had_face))
                .map_err(storage)?;
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }

    fn images_with_faces(&self) -> StoreResult<Vec<String>> {
        let tx = self.db.begin_read().map_err(storage)?;
        let table = tx.open_table(IMAGES).map_err(storage)?;

        let mut refs = Vec::new();
        for item in table.iter().map_err(storage)? {
            let (key, value) = item.map_err(storage)?;
            if value.value() != 0 {
                refs.push(key.value().to_string());
            }
        }
        Ok(refs)
    }

    fn reset(&self) -> StoreResult<()> {
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(IMAGES).map_err(storage)?;
            let keys: Vec<String> = table
                .iter()
                .map_err(storage)?
                .map(|item| item.map(|(k, _)| k.value().to_string()))
                .collect::<Result<_, _>>()
                .map_err(storage)?;
            for key in &keys {
                table.remove(key.as_str()).map_err(storage)?;
            }
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_redb_records() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("faces.redb")).unwrap();

        assert!(!store.exists(2).unwrap());
        store.insert(2, &Bytes::from_static(b"two")).unwrap();
        store.insert(0, &Bytes::from_static(b"zero")).unwrap();
        assert!(store.exists(2).unwrap());

        let err = store.insert(2, &Bytes::from_static(b"again")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(2)));

        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].cluster_id, 0);
        assert_eq!(all[1].image, Bytes::from_static(b"two"));

        store.clear().unwrap();
        assert!(store.load_all().unwrap().is_empty());
        assert!(!store.exists(2).unwrap());
    }

    #[test]
    fn test_redb_reopen_keeps_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("faces.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.insert(1, &Bytes::from_static(b"one")).unwrap();
            store.mark("img/1.jpg", true).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert!(store.exists(1).unwrap());
        assert_eq!(store.status("img/1.jpg").unwrap(), Some(true));
    }

    #[test]
    fn test_redb_ledger() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("faces.redb")).unwrap();

        store.mark("b.jpg", true).unwrap();
        store.mark("a.jpg", true).unwrap();
        store.mark("c.jpg", false).unwrap();
        assert_eq!(store.status("c.jpg").unwrap(), Some(false));
        assert_eq!(store.status("d.jpg").unwrap(), None);
        assert_eq!(store.images_with_faces().unwrap(), vec!["a.jpg", "b.jpg"]);

        store.reset().unwrap();
        assert_eq!(store.status("a.jpg").unwrap(), None);
        assert!(store.images_with_faces().unwrap().is_empty());
    }
}
