//! FeatureIndex trait definition for the layer cache.

use crate::envelope::Envelope;
use crate::rtree::{Entry, EntryHandle, FeatureId};

/// The interface the layer cache uses to look features up by area.
///
/// Implemented by the R-Tree ([`SpatialIndex`](crate::SpatialIndex)) and by
/// a linear-scan list ([`FlatIndex`](crate::FlatIndex)). Both return the same
/// entries for the same operations; only the order of results and the cost
/// of `search` differ.
///
/// Feature ids are not required to be unique. Operations keyed by id act on
/// the first matching entry.
pub trait FeatureIndex<P = ()> {
    /// Checks whether any entry carries `feature_id`.
    fn exists(&self, feature_id: FeatureId) -> bool {
        self.get(feature_id).is_some()
    }

    /// Adds an entry.
    fn insert(&mut self, feature_id: FeatureId, envelope: Envelope, payload: P) -> EntryHandle;

    /// Gets the first entry carrying `feature_id`.
    fn get(&self, feature_id: FeatureId) -> Option<&Entry<P>>;

    /// Removes and returns the first entry carrying `feature_id`.
    fn remove(&mut self, feature_id: FeatureId) -> Option<Entry<P>>;

    /// Removes the first entry carrying `feature_id`, reporting whether one
    /// was found.
    fn delete(&mut self, feature_id: FeatureId) -> bool {
        self.remove(feature_id).is_some()
    }

    /// Renames the first entry carrying `old_id`. Returns `false` if there is
    /// none.
    fn change_id(&mut self, old_id: FeatureId, new_id: FeatureId) -> bool;

    /// Finds the entries whose envelope intersects `envelope`.
    fn search(&self, envelope: &Envelope) -> Vec<&Entry<P>>;

    /// Gets every entry.
    fn get_all(&self) -> Vec<&Entry<P>>;

    /// Gets the number of entries.
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Clears all entries.
    fn clear(&mut self);
}
