use geoindex::rtree::rtree_constants::{MAGIC, VERSION};
use geoindex::{Envelope, FeatureId, FeatureIndex, IndexError, SeedPicker, SpatialIndex};
use geoindex_int_test::test_util::{assert_integrity, entry_set, grid_cell, rng, seeded_index};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn saved_layer(path: &std::path::Path) {
    let mut gen = rng(5);
    let mut index = seeded_index(4, 2, SeedPicker::Quadratic);
    for id in 0..64 {
        index.insert(id, grid_cell(&mut gen, id, 8), ());
    }
    index.save(path).unwrap();
}

fn populated() -> SpatialIndex {
    let mut index: SpatialIndex = SpatialIndex::default();
    index.insert(1, Envelope::new(0.0, 1.0, 0.0, 1.0), ());
    index.insert(2, Envelope::new(2.0, 3.0, 2.0, 3.0), ());
    index
}

#[test]
fn test_every_truncation_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layer.idx");
    saved_layer(&path);
    let bytes = fs::read(&path).unwrap();

    let cut_path = dir.path().join("cut.idx");
    for len in (0..bytes.len()).step_by(7) {
        fs::write(&cut_path, &bytes[..len]).unwrap();

        let mut index = populated();
        let before = entry_set(index.get_all());
        assert!(index.load(&cut_path).is_err(), "prefix of {} bytes loaded", len);
        assert_eq!(entry_set(index.get_all()), before);
        assert_eq!(index.size(), 2);
    }
}

#[test]
fn test_wrong_magic_is_corrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layer.idx");
    saved_layer(&path);

    let mut bytes = fs::read(&path).unwrap();
    bytes[0] ^= 0xff;
    fs::write(&path, &bytes).unwrap();

    let mut index = populated();
    assert!(matches!(index.load(&path), Err(IndexError::Corrupted(_))));
    assert_eq!(index.size(), 2);
}

#[test]
fn test_unknown_version_is_corrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layer.idx");
    saved_layer(&path);

    let mut bytes = fs::read(&path).unwrap();
    bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let mut index = populated();
    assert!(matches!(index.load(&path), Err(IndexError::Corrupted(_))));
}

#[test]
fn test_invalid_fanout_header_is_corrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layer.idx");
    saved_layer(&path);

    // min_entries above max_entries / 2
    let mut bytes = fs::read(&path).unwrap();
    bytes[12..16].copy_from_slice(&3i32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let mut index = populated();
    assert!(matches!(index.load(&path), Err(IndexError::Corrupted(_))));
}

#[test]
fn test_appended_garbage_is_corrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layer.idx");
    saved_layer(&path);

    let mut bytes = fs::read(&path).unwrap();
    bytes.extend_from_slice(&[0u8; 16]);
    fs::write(&path, &bytes).unwrap();

    let mut index = populated();
    assert!(matches!(index.load(&path), Err(IndexError::Corrupted(_))));
}

#[test]
fn test_failed_load_allows_reset() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.idx");
    fs::write(&path, b"definitely not an index").unwrap();

    let mut index = populated();
    if index.load(&path).is_err() {
        index.clear();
    }
    assert!(index.is_empty());
    index.insert(3, Envelope::point(1.0, 1.0), ());
    assert_eq!(index.search_ids(&Envelope::world()), vec![3]);
}

/// Tree layout written with tight envelopes.
enum Shape {
    Leaf(Vec<(FeatureId, Envelope)>),
    Internal(Vec<Shape>),
}

impl Shape {
    fn envelope(&self) -> Envelope {
        let mut env = Envelope::empty();
        match self {
            Shape::Leaf(entries) => entries.iter().for_each(|(_, e)| env.merge(e)),
            Shape::Internal(children) => children.iter().for_each(|c| env.merge(&c.envelope())),
        }
        env
    }

    fn entry_count(&self) -> i32 {
        match self {
            Shape::Leaf(entries) => entries.len() as i32,
            Shape::Internal(children) => children.iter().map(Shape::entry_count).sum(),
        }
    }
}

/// Writes index files record by record in the on-disk layout.
struct FileBuilder {
    bytes: Vec<u8>,
}

impl FileBuilder {
    fn header(max_entries: i32, min_entries: i32, size: i32) -> Self {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&max_entries.to_le_bytes());
        bytes.extend_from_slice(&min_entries.to_le_bytes());
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes.push(1);
        Self { bytes }
    }

    fn node(mut self, is_internal: bool, is_leaf: bool, env: Envelope, child_count: i32) -> Self {
        self.bytes.push(u8::from(is_internal));
        self.bytes.push(u8::from(is_leaf));
        for v in [env.min_x, env.min_y, env.max_x, env.max_y] {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        self.bytes.extend_from_slice(&child_count.to_le_bytes());
        self
    }

    fn entry(mut self, feature_id: FeatureId, env: Envelope) -> Self {
        for v in [env.min_x, env.min_y, env.max_x, env.max_y] {
            self.bytes.extend_from_slice(&v.to_le_bytes());
        }
        self.bytes.extend_from_slice(&feature_id.to_le_bytes());
        self
    }

    fn shape(self, shape: &Shape) -> Self {
        match shape {
            Shape::Leaf(entries) => {
                let builder = self.node(false, true, shape.envelope(), entries.len() as i32);
                entries
                    .iter()
                    .fold(builder, |b, (id, env)| b.entry(*id, *env))
            }
            Shape::Internal(children) => {
                let builder = self.node(true, false, shape.envelope(), children.len() as i32);
                children.iter().fold(builder, |b, child| b.shape(child))
            }
        }
    }

    fn write(self, path: &Path) {
        fs::write(path, self.bytes).unwrap();
    }
}

fn cell(id: FeatureId) -> (FeatureId, Envelope) {
    let x = id as f64 * 2.0;
    (id, Envelope::new(x, x + 1.0, 0.0, 1.0))
}

fn leaf(ids: &[FeatureId]) -> Shape {
    Shape::Leaf(ids.iter().map(|&id| cell(id)).collect())
}

fn write_tree(path: &Path, root: &Shape) {
    FileBuilder::header(4, 2, root.entry_count()).shape(root).write(path);
}

fn assert_rejected_as_corrupted(path: &Path) {
    let mut index = populated();
    let before = entry_set(index.get_all());
    let result = index.load(path);
    assert!(matches!(result, Err(IndexError::Corrupted(_))), "unexpected result {:?}", result);
    assert_eq!(entry_set(index.get_all()), before);
}

#[test]
fn test_hand_built_tree_loads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("built.idx");
    write_tree(&path, &Shape::Internal(vec![leaf(&[1, 2]), leaf(&[3, 4])]));

    let mut index: SpatialIndex = SpatialIndex::default();
    index.load(&path).unwrap();
    assert_eq!(index.size(), 4);
    assert_eq!(index.height(), 2);
    assert_eq!(index.search_ids(&Envelope::new(6.0, 6.5, 0.0, 1.0)), vec![3]);
    assert_integrity(&index);
}

#[test]
fn test_wrong_node_envelope_is_corrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("envelope.idx");
    let (id, env) = cell(50);
    FileBuilder::header(4, 2, 1)
        .node(false, true, Envelope::new(0.0, 0.0, 0.0, 0.0), 1)
        .entry(id, env)
        .write(&path);

    assert_rejected_as_corrupted(&path);
}

#[test]
fn test_underfull_node_is_corrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("underfull.idx");
    write_tree(&path, &Shape::Internal(vec![leaf(&[1]), leaf(&[2, 3])]));

    assert_rejected_as_corrupted(&path);
}

#[test]
fn test_single_child_internal_root_is_corrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("single.idx");
    write_tree(&path, &Shape::Internal(vec![leaf(&[1, 2])]));

    assert_rejected_as_corrupted(&path);
}

#[test]
fn test_mixed_leaf_depth_is_corrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("depth.idx");
    let root = Shape::Internal(vec![
        leaf(&[1, 2]),
        Shape::Internal(vec![leaf(&[3, 4]), leaf(&[5, 6])]),
    ]);
    write_tree(&path, &root);

    assert_rejected_as_corrupted(&path);
}

#[test]
fn test_invalid_node_flags_are_corrupted() {
    let dir = tempdir().unwrap();
    for (n, (is_internal, is_leaf)) in [(true, true), (false, false)].into_iter().enumerate() {
        let path = dir.path().join(format!("flags-{}.idx", n));
        FileBuilder::header(4, 2, 0)
            .node(is_internal, is_leaf, Envelope::world(), 0)
            .write(&path);

        assert_rejected_as_corrupted(&path);
    }
}

#[test]
fn test_negative_child_count_is_corrupted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("negative.idx");
    FileBuilder::header(4, 2, 0)
        .node(false, true, Envelope::world(), -1)
        .write(&path);

    assert_rejected_as_corrupted(&path);
}

#[test]
fn test_oversized_child_count_fails_cleanly() {
    let dir = tempdir().unwrap();
    for (n, is_internal) in [false, true].into_iter().enumerate() {
        let path = dir.path().join(format!("oversized-{}.idx", n));
        FileBuilder::header(i32::MAX, 1, 0)
            .node(is_internal, !is_internal, Envelope::world(), i32::MAX)
            .write(&path);

        let mut index = populated();
        assert!(index.load(&path).is_err());
        assert_eq!(index.size(), 2);
    }
}
