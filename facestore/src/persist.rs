//! Persistence gate: writes each cluster's representative at most once.

use std::collections::BTreeMap;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::{FaceRecordStore, StoreError, StoreResult};

/// Outcome of one [`persist`] call, per cluster id.
#[derive(Debug, Default)]
pub struct PersistReport {
    /// Clusters written by this call.
    pub inserted: Vec<u32>,
    /// Clusters that already had a record.
    pub skipped: Vec<u32>,
    /// Clusters whose existence check or insert failed.
    pub failed: Vec<(u32, StoreError)>,
}

impl PersistReport {
    /// True when no cluster failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<u32> {
        self.failed.iter().map(|(id, _)| *id).collect()
    }
}

/// Inserts the representative of every cluster that has no record yet.
///
/// Not transactional across clusters: a failure is recorded for its id and
/// the remaining clusters are still attempted. Retrying is safe because the
/// existence check runs again before every insert.
pub fn persist(clusters: &BTreeMap<u32, Bytes>, store: &dyn FaceRecordStore) -> PersistReport {
    persist_with(
        clusters,
        |id| store.exists(id),
        |id, image| store.insert(id, image),
    )
}

/// [`persist`] over plain `exists` / `insert` functions.
pub fn persist_with<E, I>(clusters: &BTreeMap<u32, Bytes>, mut exists: E, mut insert: I) -> PersistReport
where
    E: FnMut(u32) -> StoreResult<bool>,
    I: FnMut(u32, &Bytes) -> StoreResult<()>,
{
    let mut report = PersistReport::default();
    for (&id, image) in clusters {
        match exists(id) {
            Ok(true) => {
                debug!(cluster_id = id, "facestore: cluster already persisted");
                report.skipped.push(id);
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(cluster_id = id, error = %e, "facestore: existence check failed");
                report.failed.push((id, e));
                continue;
            }
        }
        match insert(id, image) {
            Ok(()) => {
                info!(cluster_id = id, bytes = image.len(), "facestore: persisted representative face");
                report.inserted.push(id);
            }
            Err(e) => {
                warn!(cluster_id = id, error = %e, "facestore: insert failed");
                report.failed.push((id, e));
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::MemoryStore;

    fn clusters(ids: &[u32]) -> BTreeMap<u32, Bytes> {
        ids.iter()
            .map(|&id| (id, Bytes::from(format!("face-{id}"))))
            .collect()
    }

    #[test]
    fn second_call_inserts_nothing() {
        let store = MemoryStore::new();
        let input = clusters(&[0, 1, 2]);

        let first = persist(&input, &store);
        assert_eq!(first.inserted, vec![0, 1, 2]);
        assert!(first.skipped.is_empty());

        let second = persist(&input, &store);
        assert!(second.inserted.is_empty());
        assert_eq!(second.skipped, vec![0, 1, 2]);
        assert_eq!(store.load_all().unwrap().len(), 3);
    }

    #[test]
    fn insert_called_once_per_id() {
        let store = MemoryStore::new();
        let calls = RefCell::new(Vec::new());
        let input = clusters(&[3, 1]);
        for _ in 0..3 {
            persist_with(
                &input,
                |id| store.exists(id),
                |id, image| {
                    calls.borrow_mut().push(id);
                    store.insert(id, image)
                },
            );
        }
        assert_eq!(calls.into_inner(), vec![1, 3]);
    }

    #[test]
    fn existing_record_is_left_untouched() {
        let store = MemoryStore::new();
        store.insert(0, &Bytes::from_static(b"old")).unwrap();

        let report = persist(&clusters(&[0, 1]), &store);
        assert_eq!(report.skipped, vec![0]);
        assert_eq!(report.inserted, vec![1]);
        assert_eq!(store.load_all().unwrap()[0].image, Bytes::from_static(b"old"));
    }

    #[test]
    fn failure_does_not_stop_other_clusters() {
        let report = persist_with(
            &clusters(&[0, 1, 2]),
            |_| Ok(false),
            |id, _| {
                if id == 1 {
                    Err(StoreError::Storage("disk full".into()))
                } else {
                    Ok(())
                }
            },
        );
        assert_eq!(report.inserted, vec![0, 2]);
        assert_eq!(report.failed_ids(), vec![1]);
        assert!(!report.is_clean());
    }

    #[test]
    fn failed_existence_check_skips_insert() {
        let mut inserted = Vec::new();
        let report = persist_with(
            &clusters(&[5]),
            |_| Err(StoreError::Storage("locked".into())),
            |id, _| {
                inserted.push(id);
                Ok(())
            },
        );
        assert!(inserted.is_empty());
        assert_eq!(report.failed_ids(), vec![5]);
    }

    #[test]
    fn empty_input() {
        let store = MemoryStore::new();
        let report = persist(&BTreeMap::new(), &store);
        assert!(report.inserted.is_empty() && report.skipped.is_empty() && report.is_clean());
    }
}
