//! Tree parameters: fanout bounds, seed-picking strategy and split RNG seed.

use serde::{Deserialize, Serialize};

use super::rtree_constants::{DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES};
use super::rtree_types::{IndexError, IndexResult};

/// Heuristic used to choose the two seeds of a node split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeedPicker {
    /// Greatest normalized separation along either axis, O(n).
    Linear,
    /// Pair wasting the most area when grouped together, O(n^2).
    Quadratic,
}

impl SeedPicker {
    pub(crate) fn to_tag(self) -> u8 {
        match self {
            SeedPicker::Linear => 0,
            SeedPicker::Quadratic => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(SeedPicker::Linear),
            1 => Some(SeedPicker::Quadratic),
            _ => None,
        }
    }
}

/// Configuration of a [`SpatialIndex`](crate::SpatialIndex).
///
/// # Examples
///
/// ```rust
/// use geoindex::{IndexConfig, SeedPicker, SpatialIndex};
///
/// let config = IndexConfig::default()
///     .with_max_entries(16)
///     .with_min_entries(6)
///     .with_seed_picker(SeedPicker::Linear)
///     .with_split_seed(42);
///
/// let index: SpatialIndex = SpatialIndex::with_config(config).unwrap();
/// assert_eq!(index.config().max_entries, 16);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub max_entries: usize,
    pub min_entries: usize,
    pub seed_picker: SeedPicker,
    /// Seed of the split tie-break RNG. `None` seeds from OS entropy, in which
    /// case tree shape (never content) may differ between runs.
    pub split_seed: Option<u64>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            min_entries: DEFAULT_MIN_ENTRIES,
            seed_picker: SeedPicker::Quadratic,
            split_seed: None,
        }
    }
}

impl IndexConfig {
    pub fn new(max_entries: usize, min_entries: usize, seed_picker: SeedPicker) -> Self {
        Self {
            max_entries,
            min_entries,
            seed_picker,
            split_seed: None,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_min_entries(mut self, min_entries: usize) -> Self {
        self.min_entries = min_entries;
        self
    }

    pub fn with_seed_picker(mut self, seed_picker: SeedPicker) -> Self {
        self.seed_picker = seed_picker;
        self
    }

    pub fn with_split_seed(mut self, seed: u64) -> Self {
        self.split_seed = Some(seed);
        self
    }

    /// Checks the fanout bounds.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] if `max_entries < 2`,
    /// `min_entries == 0` or `min_entries > max_entries / 2`. Values are
    /// never clamped.
    pub fn validate(&self) -> IndexResult<()> {
        if self.max_entries < 2 {
            return Err(IndexError::InvalidConfig(format!(
                "max_entries must be at least 2, got {}",
                self.max_entries
            )));
        }
        if self.min_entries == 0 {
            return Err(IndexError::InvalidConfig(
                "min_entries must be at least 1".into(),
            ));
        }
        if self.min_entries > self.max_entries / 2 {
            return Err(IndexError::InvalidConfig(format!(
                "min_entries ({}) must not exceed max_entries / 2 ({})",
                self.min_entries,
                self.max_entries / 2
            )));
        }
        Ok(())
    }
}
