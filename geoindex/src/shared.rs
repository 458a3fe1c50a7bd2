//! Lock-guarded handle for using one index from several threads.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use crate::envelope::Envelope;
use crate::feature_index::FeatureIndex;
use crate::rtree::{Entry, EntryHandle, FeatureId, IndexResult, SpatialIndex};

/// Cheaply clonable handle to a [`SpatialIndex`] behind a read/write lock.
///
/// Queries and saves share the read lock; insert, delete, rename, clear and
/// load take the write lock. Query results are cloned out so no guard
/// outlives the call; use [`read`](Self::read) to borrow entries instead.
pub struct SharedSpatialIndex<P = ()> {
    inner: Arc<RwLock<SpatialIndex<P>>>,
}

impl<P> Clone for SharedSpatialIndex<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> Default for SharedSpatialIndex<P> {
    fn default() -> Self {
        Self::new(SpatialIndex::default())
    }
}

impl<P> std::fmt::Debug for SharedSpatialIndex<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSpatialIndex")
            .field("index", &*self.inner.read())
            .finish()
    }
}

impl<P> SharedSpatialIndex<P> {
    pub fn new(index: SpatialIndex<P>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SpatialIndex<P>> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, SpatialIndex<P>> {
        self.inner.write()
    }

    pub fn insert(&self, feature_id: FeatureId, envelope: Envelope, payload: P) -> EntryHandle {
        self.inner.write().insert(feature_id, envelope, payload)
    }

    pub fn remove(&self, feature_id: FeatureId) -> Option<Entry<P>> {
        self.inner.write().remove(feature_id)
    }

    pub fn delete(&self, feature_id: FeatureId) -> bool {
        self.inner.write().delete(feature_id)
    }

    pub fn change_id(&self, old_id: FeatureId, new_id: FeatureId) -> bool {
        self.inner.write().change_id(old_id, new_id)
    }

    pub fn exists(&self, feature_id: FeatureId) -> bool {
        self.inner.read().exists(feature_id)
    }

    pub fn search_ids(&self, envelope: &Envelope) -> Vec<FeatureId> {
        self.inner.read().search_ids(envelope)
    }

    pub fn size(&self) -> usize {
        self.inner.read().size()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }
}

impl<P: Clone> SharedSpatialIndex<P> {
    pub fn get(&self, feature_id: FeatureId) -> Option<Entry<P>> {
        self.inner.read().get(feature_id).cloned()
    }

    pub fn search(&self, envelope: &Envelope) -> Vec<Entry<P>> {
        self.inner
            .read()
            .search(envelope)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn get_all(&self) -> Vec<Entry<P>> {
        self.inner.read().iter().cloned().collect()
    }
}

impl<P: Serialize + DeserializeOwned> SharedSpatialIndex<P> {
    pub fn save(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        self.inner.read().save(path)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        self.inner.write().load(path)
    }
}
