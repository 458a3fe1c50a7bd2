use geoindex::{FeatureIndex, SeedPicker, SpatialIndex};
use geoindex_int_test::test_util::{
    assert_integrity, entry_set, random_envelope, rng, seeded_index,
};
use rand::Rng;
use tempfile::tempdir;

#[test]
fn test_round_trip_after_mixed_workload() {
    let dir = tempdir().unwrap();

    for (n, picker) in [SeedPicker::Linear, SeedPicker::Quadratic].into_iter().enumerate() {
        let path = dir.path().join(format!("layer-{}.idx", n));
        let mut gen = rng(40 + n as u64);
        let mut index = seeded_index(6, 2, picker);

        for id in 0..800 {
            index.insert(id, random_envelope(&mut gen, 10_000.0, 250.0), ());
        }
        for _ in 0..300 {
            index.delete(gen.gen_range(0..800));
        }
        index.change_id(1, 10_001);
        index.save(&path).unwrap();

        let mut restored: SpatialIndex = SpatialIndex::default();
        restored.load(&path).unwrap();

        assert_integrity(&restored);
        assert_eq!(restored.size(), index.size());
        assert_eq!(restored.height(), index.height());
        assert_eq!(restored.config().max_entries, 6);
        assert_eq!(restored.config().min_entries, 2);
        assert_eq!(restored.config().seed_picker, picker);
        assert_eq!(entry_set(restored.get_all()), entry_set(index.get_all()));
    }
}

#[test]
fn test_restored_index_keeps_working() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("layer.idx");
    let mut gen = rng(77);

    let mut index = seeded_index(4, 2, SeedPicker::Quadratic);
    for id in 0..200 {
        index.insert(id, random_envelope(&mut gen, 1_000.0, 20.0), ());
    }
    index.save(&path).unwrap();

    let mut restored: SpatialIndex = SpatialIndex::default();
    restored.load(&path).unwrap();
    for id in 0..100 {
        assert!(restored.delete(id * 2));
    }
    for id in 200..300 {
        restored.insert(id, random_envelope(&mut gen, 1_000.0, 20.0), ());
    }
    assert_integrity(&restored);
    assert_eq!(restored.size(), 200);

    restored.save(&path).unwrap();
    let mut again: SpatialIndex = SpatialIndex::default();
    again.load(&path).unwrap();
    assert_eq!(entry_set(again.get_all()), entry_set(restored.get_all()));
}

#[test]
fn test_empty_index_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.idx");

    let index: SpatialIndex = SpatialIndex::default();
    index.save(&path).unwrap();

    let mut restored = seeded_index(4, 2, SeedPicker::Linear);
    restored.load(&path).unwrap();
    assert!(restored.is_empty());
    assert_eq!(restored.height(), 1);
    assert_eq!(restored.config().max_entries, 8);
    assert_integrity(&restored);
}
