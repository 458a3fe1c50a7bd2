//! In-memory R-Tree over feature envelopes.
//!
//! This module provides the index used by the layer cache:
//! - Arena-backed nodes linked by position, with parent back links
//! - Guttman insertion with linear or quadratic node splits
//! - Deletion with tree condensing and orphan reinsertion
//! - Compact binary persistence with a versioned header

pub mod config;
mod persistence;
pub mod rtree_constants;
pub mod rtree_types;
mod rtree_impl;
mod split;

pub use config::{IndexConfig, SeedPicker};
pub use rtree_constants::{DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES};
pub use rtree_impl::{Iter, SpatialIndex};
pub use rtree_types::{
    Entry, EntryHandle, FeatureId, IndexError, IndexResult, IntegrityReport, RTreeStats,
};
