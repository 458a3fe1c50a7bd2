//! Flat list of entries with linear scans. Small and simple; good for tiny
//! layers and as a reference when testing the R-Tree.

use crate::envelope::Envelope;
use crate::feature_index::FeatureIndex;
use crate::rtree::{Entry, EntryHandle, FeatureId};

/// Unindexed [`FeatureIndex`]: every query is a scan over all entries.
pub struct FlatIndex<P = ()> {
    entries: Vec<Entry<P>>,
}

impl<P> Default for FlatIndex<P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<P> std::fmt::Debug for FlatIndex<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatIndex")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<P> FlatIndex<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry<P>> {
        self.entries.iter()
    }
}

impl<P> FromIterator<Entry<P>> for FlatIndex<P> {
    fn from_iter<I: IntoIterator<Item = Entry<P>>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<P> FeatureIndex<P> for FlatIndex<P> {
    /// # Panics
    ///
    /// Panics if `envelope` is uninitialized, like [`SpatialIndex`](crate::SpatialIndex).
    fn insert(&mut self, feature_id: FeatureId, envelope: Envelope, payload: P) -> EntryHandle {
        assert!(envelope.is_init(), "cannot index feature {} without an envelope", feature_id);

        let entry = Entry::new(feature_id, envelope, payload);
        let handle = entry.handle();
        self.entries.push(entry);
        handle
    }

    fn get(&self, feature_id: FeatureId) -> Option<&Entry<P>> {
        self.entries.iter().find(|e| e.feature_id == feature_id)
    }

    fn remove(&mut self, feature_id: FeatureId) -> Option<Entry<P>> {
        let pos = self.entries.iter().position(|e| e.feature_id == feature_id)?;
        Some(self.entries.remove(pos))
    }

    fn change_id(&mut self, old_id: FeatureId, new_id: FeatureId) -> bool {
        match self.entries.iter_mut().find(|e| e.feature_id == old_id) {
            Some(entry) => {
                entry.feature_id = new_id;
                true
            }
            None => false,
        }
    }

    fn search(&self, envelope: &Envelope) -> Vec<&Entry<P>> {
        self.entries
            .iter()
            .filter(|e| e.envelope.intersects(envelope))
            .collect()
    }

    fn get_all(&self) -> Vec<&Entry<P>> {
        self.entries.iter().collect()
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
