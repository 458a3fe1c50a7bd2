//! # geoindex - Spatial Indexing for Mobile GIS Layers
//!
//! This crate provides the spatial index behind the feature layers of a
//! mobile GIS: a mutable R-Tree mapping feature identifiers to bounding
//! envelopes, answering "which features overlap this rectangle" queries.
//!
//! ## Features
//!
//! - **Envelope Algebra**: merge, intersect and contain tests on rectangles
//! - **Mutable R-Tree**: insert, delete, rename with Guttman's linear or
//!   quadratic node splits and tree condensing
//! - **Arena Storage**: nodes linked by position, no reference cycles
//! - **Persistent**: compact binary save/load with a dirty-flag fast path
//! - **Payloads**: any per-feature payload, e.g. label and geometry
//! - **Thread Safe Handle**: shared reads, exclusive writes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use geoindex::{Envelope, FeatureIndex, SpatialIndex};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut index: SpatialIndex = SpatialIndex::default();
//!
//! // Add entries
//! index.insert(1, Envelope::new(0.0, 10.0, 0.0, 10.0), ());
//! index.insert(2, Envelope::new(20.0, 30.0, 20.0, 30.0), ());
//!
//! // Find intersecting entries
//! let hits = index.search_ids(&Envelope::new(5.0, 15.0, 5.0, 15.0));
//! assert_eq!(hits, vec![1]);
//!
//! // Persist and restore
//! index.save("layer.idx")?;
//! let mut restored: SpatialIndex = SpatialIndex::default();
//! restored.load("layer.idx")?;
//! # Ok(())
//! # }
//! ```

pub mod envelope;
pub mod feature_index;
pub mod flat_index;
pub mod geometry;
pub mod labeled;
pub mod rtree;
pub mod shared;

pub use envelope::{Envelope, WORLD_BOUND};
pub use feature_index::FeatureIndex;
pub use flat_index::FlatIndex;
pub use geometry::ComputeEnvelope;
pub use labeled::{Labeled, LabeledIndex};
pub use rtree::{
    Entry, EntryHandle, FeatureId, IndexConfig, IndexError, IndexResult, IntegrityReport,
    RTreeStats, SeedPicker, SpatialIndex,
};
pub use shared::SharedSpatialIndex;
