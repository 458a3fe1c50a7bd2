use geoindex::{
    Entry, Envelope, FeatureId, FeatureIndex, FlatIndex, IndexConfig, SeedPicker, SpatialIndex,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Deterministic RNG for workload generation.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Index with a fixed split seed so tree shape is reproducible.
pub fn seeded_index(max_entries: usize, min_entries: usize, picker: SeedPicker) -> SpatialIndex {
    let config = IndexConfig::new(max_entries, min_entries, picker).with_split_seed(0x5eed);
    SpatialIndex::with_config(config).expect("valid test config")
}

/// Random box with corners inside `[-extent, extent]` and sides up to `max_side`.
pub fn random_envelope(rng: &mut StdRng, extent: f64, max_side: f64) -> Envelope {
    let x = rng.gen_range(-extent..extent);
    let y = rng.gen_range(-extent..extent);
    let w = rng.gen_range(0.0..max_side);
    let h = rng.gen_range(0.0..max_side);
    Envelope::new(x, x + w, y, y + h)
}

/// Unit box in cell `i` of a grid `columns` wide, jittered but never
/// overlapping its neighbours.
pub fn grid_cell(rng: &mut StdRng, i: i64, columns: i64) -> Envelope {
    let x = (i % columns) as f64 * 2.0 + rng.gen_range(0.0..0.9);
    let y = (i / columns) as f64 * 2.0 + rng.gen_range(0.0..0.9);
    Envelope::new(x, x + 1.0, y, y + 1.0)
}

pub fn id_set<P>(entries: Vec<&Entry<P>>) -> HashSet<FeatureId> {
    entries.into_iter().map(|e| e.feature_id).collect()
}

/// Entries as comparable `(id, bounds bits)` tuples.
pub fn entry_set<P>(entries: Vec<&Entry<P>>) -> HashSet<(FeatureId, [u64; 4])> {
    entries
        .into_iter()
        .map(|e| {
            let env = e.envelope;
            (
                e.feature_id,
                [
                    env.min_x.to_bits(),
                    env.max_x.to_bits(),
                    env.min_y.to_bits(),
                    env.max_y.to_bits(),
                ],
            )
        })
        .collect()
}

/// Panics with the collected messages if the tree is structurally broken.
pub fn assert_integrity<P>(index: &SpatialIndex<P>) {
    let report = index.check_integrity();
    assert!(report.is_valid, "integrity errors: {:#?}", report.errors);
}

/// Applies the same operation to the tree and to the flat oracle and checks
/// they agree on the outcome.
pub struct Mirror {
    pub tree: SpatialIndex,
    pub flat: FlatIndex,
}

impl Mirror {
    pub fn new(tree: SpatialIndex) -> Self {
        Self {
            tree,
            flat: FlatIndex::new(),
        }
    }

    pub fn insert(&mut self, id: FeatureId, envelope: Envelope) {
        let a = self.tree.insert(id, envelope, ());
        let b = self.flat.insert(id, envelope, ());
        assert_eq!(a, b);
    }

    pub fn delete(&mut self, id: FeatureId) {
        assert_eq!(self.tree.delete(id), self.flat.delete(id), "delete({}) disagrees", id);
    }

    pub fn change_id(&mut self, old_id: FeatureId, new_id: FeatureId) {
        assert_eq!(
            self.tree.change_id(old_id, new_id),
            self.flat.change_id(old_id, new_id),
            "change_id({}, {}) disagrees",
            old_id,
            new_id
        );
    }

    pub fn check_query(&self, query: &Envelope) {
        assert_eq!(
            entry_set(self.tree.search(query)),
            entry_set(self.flat.search(query)),
            "search({}) disagrees",
            query
        );
    }

    pub fn check_all(&self) {
        assert_eq!(self.tree.size(), self.flat.size());
        assert_eq!(entry_set(self.tree.get_all()), entry_set(self.flat.get_all()));
    }
}
