//! Index variant carrying a display label and the full geometry per feature.

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

use crate::feature_index::FeatureIndex;
use crate::geometry::ComputeEnvelope;
use crate::rtree::{EntryHandle, FeatureId, IndexConfig, IndexResult, SpatialIndex};

/// Payload of a [`LabeledIndex`] entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labeled<G> {
    pub label: String,
    pub geometry: G,
}

/// A [`SpatialIndex`] whose entries keep a label and their geometry, used by
/// layers that render feature captions.
///
/// Dereferences to the inner index, so every query and persistence call of
/// [`SpatialIndex`] is available.
///
/// # Examples
///
/// ```rust
/// use geoindex::{Envelope, FeatureIndex, LabeledIndex};
///
/// let mut index: LabeledIndex<Vec<(f64, f64)>> = LabeledIndex::default();
/// index.insert_feature(7, "Main street", vec![(0.0, 0.0), (10.0, 2.0)]);
///
/// let hits = index.search(&Envelope::new(4.0, 5.0, 0.0, 1.0));
/// assert_eq!(hits[0].payload.label, "Main street");
/// ```
#[derive(Debug)]
pub struct LabeledIndex<G> {
    inner: SpatialIndex<Labeled<G>>,
}

impl<G> Default for LabeledIndex<G> {
    fn default() -> Self {
        Self {
            inner: SpatialIndex::default(),
        }
    }
}

impl<G: ComputeEnvelope> LabeledIndex<G> {
    pub fn with_config(config: IndexConfig) -> IndexResult<Self> {
        Ok(Self {
            inner: SpatialIndex::with_config(config)?,
        })
    }

    /// Indexes `geometry` under its computed envelope.
    ///
    /// Returns `None` and leaves the index unchanged when the geometry has no
    /// envelope, e.g. an empty coordinate sequence.
    pub fn insert_feature(
        &mut self,
        feature_id: FeatureId,
        label: impl Into<String>,
        geometry: G,
    ) -> Option<EntryHandle> {
        let envelope = geometry.compute_envelope();
        if !envelope.is_init() {
            log::debug!("Feature {} has an empty geometry, not indexed", feature_id);
            return None;
        }
        let payload = Labeled {
            label: label.into(),
            geometry,
        };
        Some(self.inner.insert(feature_id, envelope, payload))
    }

    pub fn label(&self, feature_id: FeatureId) -> Option<&str> {
        self.inner
            .get(feature_id)
            .map(|entry| entry.payload.label.as_str())
    }

    pub fn geometry(&self, feature_id: FeatureId) -> Option<&G> {
        self.inner
            .get(feature_id)
            .map(|entry| &entry.payload.geometry)
    }

    pub fn into_inner(self) -> SpatialIndex<Labeled<G>> {
        self.inner
    }
}

impl<G> Deref for LabeledIndex<G> {
    type Target = SpatialIndex<Labeled<G>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<G> DerefMut for LabeledIndex<G> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
