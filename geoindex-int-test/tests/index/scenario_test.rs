use geoindex::{Envelope, FeatureIndex, SeedPicker, SpatialIndex};
use geoindex_int_test::test_util::{assert_integrity, grid_cell, id_set, rng, seeded_index};
use std::collections::HashSet;

#[test]
fn test_small_fanout_keeps_every_entry() {
    let mut index = seeded_index(4, 2, SeedPicker::Quadratic);
    for i in 0..10 {
        let x = i as f64;
        index.insert(i + 1, Envelope::new(x, x, x + 1.0, x + 1.0), ());
    }

    assert_eq!(index.size(), 10);
    let hits = id_set(index.search(&Envelope::new(-1000.0, 1000.0, -1000.0, 1000.0)));
    assert_eq!(hits, (1..=10).collect::<HashSet<_>>());
    assert!(index.height() > 1);
    assert_integrity(&index);
}

#[test]
fn test_search_excludes_disjoint_and_drops_deleted() {
    let mut index: SpatialIndex = SpatialIndex::default();
    index.insert(1, Envelope::new(0.0, 10.0, 0.0, 10.0), ());
    index.insert(2, Envelope::new(20.0, 30.0, 20.0, 30.0), ());
    index.insert(3, Envelope::new(5.0, 15.0, 5.0, 15.0), ());

    let query = Envelope::new(0.0, 10.0, 0.0, 10.0);
    assert_eq!(id_set(index.search(&query)), HashSet::from([1, 3]));

    assert!(index.delete(3));
    assert_eq!(id_set(index.search(&query)), HashSet::from([1]));
    assert_eq!(index.size(), 2);
}

#[test]
fn test_envelope_merge_and_edge_contact() {
    let mut merged = Envelope::new(0.0, 10.0, 0.0, 10.0);
    merged.merge(&Envelope::new(5.0, 15.0, 5.0, 15.0));
    assert_eq!(merged, Envelope::new(0.0, 15.0, 0.0, 15.0));

    let a = Envelope::new(0.0, 10.0, 0.0, 10.0);
    let b = Envelope::new(10.0, 20.0, 10.0, 20.0);
    assert!(a.intersects(&b));
    assert!(b.intersects(&a));
}

#[test]
fn test_delete_every_third_of_two_hundred() {
    for picker in [SeedPicker::Linear, SeedPicker::Quadratic] {
        let mut gen = rng(200);
        let mut index = seeded_index(8, 2, picker);
        for i in 0..200 {
            index.insert(i, grid_cell(&mut gen, i, 20), ());
        }
        assert_integrity(&index);

        for i in (0..200).step_by(3) {
            assert!(index.delete(i), "{:?}: failed to delete {}", picker, i);
        }
        assert_integrity(&index);

        let survivors: HashSet<_> = (0..200).filter(|i| i % 3 != 0).collect();
        assert_eq!(survivors.len(), 133);
        assert_eq!(index.size(), survivors.len());
        assert_eq!(id_set(index.search(&Envelope::world())), survivors);
    }
}

#[test]
fn test_missing_id_is_a_no_op() {
    let mut index = seeded_index(4, 2, SeedPicker::Linear);
    let mut gen = rng(7);
    for i in 0..30 {
        index.insert(i, grid_cell(&mut gen, i, 6), ());
    }
    let bounds = index.bounds();

    assert!(!index.delete(999));
    assert!(!index.change_id(999, 1000));
    assert!(index.get(999).is_none());
    assert_eq!(index.size(), 30);
    assert_eq!(index.bounds(), bounds);
}

#[test]
fn test_duplicate_ids_are_separate_entries() {
    let mut index = seeded_index(4, 2, SeedPicker::Quadratic);
    index.insert(5, Envelope::new(0.0, 1.0, 0.0, 1.0), ());
    index.insert(5, Envelope::new(50.0, 51.0, 50.0, 51.0), ());
    assert_eq!(index.size(), 2);

    assert!(index.delete(5));
    assert!(index.exists(5));
    assert!(index.delete(5));
    assert!(!index.exists(5));
    assert_eq!(index.size(), 0);
}

#[test]
fn test_clear_then_reuse() {
    let mut index = seeded_index(4, 2, SeedPicker::Quadratic);
    let mut gen = rng(3);
    for i in 0..50 {
        index.insert(i, grid_cell(&mut gen, i, 10), ());
    }
    index.clear();
    assert_eq!(index.size(), 0);
    assert_eq!(index.height(), 1);
    assert!(index.search(&Envelope::world()).is_empty());

    index.insert(1, Envelope::point(3.0, 4.0), ());
    assert_eq!(index.search_ids(&Envelope::new(3.0, 3.0, 4.0, 4.0)), vec![1]);
    assert_integrity(&index);
}

#[test]
fn test_contained_query_is_subset_of_intersecting() {
    let mut index = seeded_index(6, 3, SeedPicker::Quadratic);
    let mut gen = rng(11);
    for i in 0..120 {
        index.insert(i, grid_cell(&mut gen, i, 12), ());
    }
    let query = Envelope::new(3.5, 12.5, 3.5, 12.5);
    let contained = id_set(index.find_contained(&query));
    let touching = id_set(index.search(&query));

    assert!(!contained.is_empty());
    assert!(contained.is_subset(&touching));
    for id in &contained {
        let entry = index.get(*id).expect("contained entry exists");
        assert!(query.contains(&entry.envelope));
    }
}
