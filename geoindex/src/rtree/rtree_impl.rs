//! SpatialIndex implementation.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::envelope::Envelope;
use crate::feature_index::FeatureIndex;

use super::config::{IndexConfig, SeedPicker};
use super::rtree_types::{
    Entry, EntryHandle, FeatureId, IndexResult, IntegrityReport, Node, NodeIdx, NodeKind,
    RTreeStats,
};
use super::split;

/// A mutable R-Tree over feature envelopes.
///
/// Nodes live in an arena owned by the index and refer to their children and
/// parent by position, never by pointer. The tree is rooted at a leaf covering
/// the whole projection extent until the first entry arrives.
///
/// The index is single-writer: mutations take `&mut self`. Read operations
/// (`search`, `get_all`, [`save`](SpatialIndex::save)) take `&self` and can
/// share a lock, see [`SharedSpatialIndex`](crate::SharedSpatialIndex).
///
/// # Examples
///
/// ```rust
/// use geoindex::{Envelope, FeatureIndex, SpatialIndex};
///
/// let mut index: SpatialIndex = SpatialIndex::default();
/// index.insert(1, Envelope::new(0.0, 10.0, 0.0, 10.0), ());
/// index.insert(2, Envelope::new(20.0, 30.0, 20.0, 30.0), ());
///
/// let hits = index.search(&Envelope::new(5.0, 6.0, 5.0, 6.0));
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].feature_id, 1);
/// ```
pub struct SpatialIndex<P = ()> {
    pub(super) config: IndexConfig,
    pub(super) nodes: Vec<Option<Node<P>>>,
    /// Arena slots released by splits, condensing and root collapse
    pub(super) free_nodes: Vec<NodeIdx>,
    pub(super) root: NodeIdx,
    pub(super) size: usize,
    rng: StdRng,
    /// Set by every mutation, cleared by a successful save or load
    pub(super) dirty: AtomicBool,
    /// Target of the last successful save or load
    pub(super) saved_path: Mutex<Option<PathBuf>>,
}

impl<P> Default for SpatialIndex<P> {
    fn default() -> Self {
        Self::from_valid_config(IndexConfig::default())
    }
}

impl<P> std::fmt::Debug for SpatialIndex<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("config", &self.config)
            .field("size", &self.size)
            .field("arena_slots", &self.nodes.len())
            .field("free_slots", &self.free_nodes.len())
            .finish_non_exhaustive()
    }
}

impl<P> SpatialIndex<P> {
    /// Creates an empty index with the given fanout and seed-picking strategy.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`](crate::IndexError::InvalidConfig)
    /// if `min_entries > max_entries / 2`.
    pub fn new(max_entries: usize, min_entries: usize, seed_picker: SeedPicker) -> IndexResult<Self> {
        Self::with_config(IndexConfig::new(max_entries, min_entries, seed_picker))
    }

    /// Creates an empty index from a full configuration.
    pub fn with_config(config: IndexConfig) -> IndexResult<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    pub(super) fn from_valid_config(config: IndexConfig) -> Self {
        let rng = match config.split_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            nodes: vec![Some(Node::leaf(Envelope::world(), None))],
            free_nodes: Vec::new(),
            root: NodeIdx::new(0),
            size: 0,
            rng,
            dirty: AtomicBool::new(false),
            saved_path: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Envelope of the root node. Tight around all entries, or the world
    /// bound when the index is empty.
    pub fn bounds(&self) -> Envelope {
        self.node(self.root).envelope
    }

    // ------------------------------------------------------------------------
    // Arena
    // ------------------------------------------------------------------------

    pub(super) fn node(&self, idx: NodeIdx) -> &Node<P> {
        match self.nodes.get(idx.get()) {
            Some(Some(node)) => node,
            _ => panic!("dangling node reference {:?}", idx),
        }
    }

    pub(super) fn node_mut(&mut self, idx: NodeIdx) -> &mut Node<P> {
        match self.nodes.get_mut(idx.get()) {
            Some(Some(node)) => node,
            _ => panic!("dangling node reference {:?}", idx),
        }
    }

    /// Stores a node, reusing a released slot when one is available.
    pub(super) fn allocate_node(&mut self, node: Node<P>) -> NodeIdx {
        if let Some(idx) = self.free_nodes.pop() {
            self.nodes[idx.get()] = Some(node);
            return idx;
        }
        self.nodes.push(Some(node));
        NodeIdx::new(self.nodes.len() - 1)
    }

    /// Releases a slot and hands back the node that occupied it.
    fn free_node(&mut self, idx: NodeIdx) -> Node<P> {
        let node = match self.nodes.get_mut(idx.get()).and_then(Option::take) {
            Some(node) => node,
            None => panic!("double free of node {:?}", idx),
        };
        self.free_nodes.push(idx);
        node
    }

    fn mark_dirty(&mut self) {
        *self.dirty.get_mut() = true;
    }

    /// Union of the node's children envelopes.
    pub(super) fn children_envelope(&self, idx: NodeIdx) -> Envelope {
        match &self.node(idx).kind {
            NodeKind::Leaf(entries) => entries.iter().fold(Envelope::empty(), |mut env, e| {
                env.merge(&e.envelope);
                env
            }),
            NodeKind::Internal(children) => {
                children.iter().fold(Envelope::empty(), |mut env, &child| {
                    env.merge(&self.node(child).envelope);
                    env
                })
            }
        }
    }

    /// Recomputes the node's envelope from its children.
    fn tighten(&mut self, idx: NodeIdx) {
        let env = self.children_envelope(idx);
        if env.is_init() {
            self.node_mut(idx).envelope = env;
        } else {
            assert!(idx == self.root, "tightening empty non-root node {:?}", idx);
            self.node_mut(idx).envelope = Envelope::world();
        }
    }

    // ------------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------------

    /// Places an entry without touching the size counter.
    fn insert_entry(&mut self, entry: Entry<P>) {
        let leaf = self.choose_leaf(&entry.envelope);

        let len = match &mut self.node_mut(leaf).kind {
            NodeKind::Leaf(entries) => {
                entries.push(entry);
                entries.len()
            }
            NodeKind::Internal(_) => unreachable!("choose_leaf returned an internal node"),
        };

        if len > self.config.max_entries {
            let sibling = self.split_node(leaf);
            self.adjust_tree(leaf, Some(sibling));
        } else {
            self.adjust_tree(leaf, None);
        }
    }

    /// Descends to the leaf needing the least enlargement to cover `envelope`.
    fn choose_leaf(&self, envelope: &Envelope) -> NodeIdx {
        let mut idx = self.root;
        loop {
            match &self.node(idx).kind {
                NodeKind::Leaf(_) => return idx,
                NodeKind::Internal(children) => {
                    assert!(!children.is_empty(), "internal node {:?} has no children", idx);

                    let mut best = children[0];
                    let mut best_enlargement = f64::INFINITY;
                    let mut best_area = f64::INFINITY;

                    for &child in children {
                        let child_env = &self.node(child).envelope;
                        let enlargement = child_env.enlargement(envelope);
                        let area = child_env.area() + enlargement;

                        if enlargement < best_enlargement
                            || (enlargement == best_enlargement && area < best_area)
                        {
                            best_enlargement = enlargement;
                            best_area = area;
                            best = child;
                        }
                    }
                    idx = best;
                }
            }
        }
    }

    /// Splits an overflowing node in two. The node keeps its slot and parent
    /// link and holds the first group; the returned sibling holds the second
    /// and is not yet linked into the parent.
    fn split_node(&mut self, idx: NodeIdx) -> NodeIdx {
        let envelopes: Vec<Envelope> = match &self.node(idx).kind {
            NodeKind::Leaf(entries) => entries.iter().map(|e| e.envelope).collect(),
            NodeKind::Internal(children) => children.iter().map(|&c| self.node(c).envelope).collect(),
        };

        let (first, second) = split::partition(
            &envelopes,
            self.config.min_entries,
            self.config.seed_picker,
            &mut self.rng,
        );

        let parent = self.node(idx).parent;
        let kind = std::mem::replace(&mut self.node_mut(idx).kind, NodeKind::Leaf(Vec::new()));

        let sibling = match kind {
            NodeKind::Leaf(entries) => {
                let (kept, moved) = distribute(entries, &first, &second);
                self.node_mut(idx).kind = NodeKind::Leaf(kept);
                self.allocate_node(Node {
                    envelope: Envelope::empty(),
                    parent,
                    kind: NodeKind::Leaf(moved),
                })
            }
            NodeKind::Internal(children) => {
                let (kept, moved) = distribute(children, &first, &second);
                self.node_mut(idx).kind = NodeKind::Internal(kept);
                let sibling = self.allocate_node(Node::internal(parent, moved.clone()));
                for child in moved {
                    self.node_mut(child).parent = Some(sibling);
                }
                sibling
            }
        };

        self.tighten(idx);
        self.tighten(sibling);

        log::debug!(
            "Split node {:?} into {} + {} children (sibling {:?})",
            idx,
            first.len(),
            second.len(),
            sibling
        );
        sibling
    }

    /// Walks from a modified node to the root, retightening envelopes and
    /// linking split siblings into their parents, splitting those in turn
    /// when they overflow.
    fn adjust_tree(&mut self, mut idx: NodeIdx, mut split: Option<NodeIdx>) {
        loop {
            self.tighten(idx);

            let Some(parent) = self.node(idx).parent else {
                if let Some(sibling) = split {
                    self.grow_root(idx, sibling);
                }
                return;
            };

            if let Some(sibling) = split {
                self.node_mut(sibling).parent = Some(parent);
                let len = match &mut self.node_mut(parent).kind {
                    NodeKind::Internal(children) => {
                        children.push(sibling);
                        children.len()
                    }
                    NodeKind::Leaf(_) => unreachable!("parent {:?} is a leaf", parent),
                };
                split = if len > self.config.max_entries {
                    Some(self.split_node(parent))
                } else {
                    None
                };
            }

            idx = parent;
        }
    }

    /// Puts a new root above the two halves of a split root.
    fn grow_root(&mut self, old_root: NodeIdx, sibling: NodeIdx) {
        let new_root = self.allocate_node(Node::internal(None, vec![old_root, sibling]));
        self.node_mut(old_root).parent = Some(new_root);
        self.node_mut(sibling).parent = Some(new_root);
        self.root = new_root;
        self.tighten(new_root);

        log::debug!("Root split, tree height is now {}", self.height());
    }

    // ------------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------------

    /// Depth-first search for the leaf holding `feature_id`, returning the
    /// leaf and the entry's position in it.
    fn find_leaf(&self, idx: NodeIdx, feature_id: FeatureId) -> Option<(NodeIdx, usize)> {
        match &self.node(idx).kind {
            NodeKind::Leaf(entries) => entries
                .iter()
                .position(|e| e.feature_id == feature_id)
                .map(|pos| (idx, pos)),
            NodeKind::Internal(children) => children
                .iter()
                .find_map(|&child| self.find_leaf(child, feature_id)),
        }
    }

    /// Rebalances after an entry left `leaf`: underflowing nodes on the path
    /// to the root are dissolved and their entries reinserted.
    fn condense_tree(&mut self, leaf: NodeIdx) {
        let mut orphans = Vec::new();
        let mut idx = leaf;

        while let Some(parent) = self.node(idx).parent {
            if self.node(idx).len() < self.config.min_entries {
                if let NodeKind::Internal(children) = &mut self.node_mut(parent).kind {
                    children.retain(|&c| c != idx);
                }
                self.dissolve(idx, &mut orphans);
            } else {
                self.tighten(idx);
            }
            idx = parent;
        }

        self.shrink_root();

        if !orphans.is_empty() {
            log::debug!("Condense reinserting {} orphaned entries", orphans.len());
        }
        for entry in orphans {
            self.insert_entry(entry);
        }
    }

    /// Frees a detached subtree and collects its entries.
    fn dissolve(&mut self, idx: NodeIdx, orphans: &mut Vec<Entry<P>>) {
        match self.free_node(idx).kind {
            NodeKind::Leaf(entries) => orphans.extend(entries),
            NodeKind::Internal(children) => {
                for child in children {
                    self.dissolve(child, orphans);
                }
            }
        }
    }

    /// Resets an empty root and collapses single-child internal roots.
    fn shrink_root(&mut self) {
        loop {
            let root = self.root;
            let node = self.node(root);
            let only_child = match &node.kind {
                NodeKind::Internal(children) if children.len() == 1 => Some(children[0]),
                _ => None,
            };
            let empty = node.is_empty();

            if let Some(child) = only_child {
                self.free_node(root);
                self.node_mut(child).parent = None;
                self.root = child;
                log::debug!("Root collapsed into {:?}", child);
                continue;
            }

            if empty {
                let root_node = self.node_mut(root);
                root_node.kind = NodeKind::Leaf(Vec::new());
                root_node.envelope = Envelope::world();
            } else {
                self.tighten(root);
            }
            return;
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    fn search_recursive<'a>(&'a self, idx: NodeIdx, query: &Envelope, results: &mut Vec<&'a Entry<P>>) {
        let node = self.node(idx);
        if !node.envelope.intersects(query) {
            return;
        }
        match &node.kind {
            NodeKind::Leaf(entries) => {
                results.extend(entries.iter().filter(|e| e.envelope.intersects(query)));
            }
            NodeKind::Internal(children) => {
                for &child in children {
                    self.search_recursive(child, query, results);
                }
            }
        }
    }

    fn contained_recursive<'a>(&'a self, idx: NodeIdx, query: &Envelope, results: &mut Vec<&'a Entry<P>>) {
        let node = self.node(idx);
        // A contained entry can sit in a child that only partially overlaps
        if !node.envelope.intersects(query) {
            return;
        }
        match &node.kind {
            NodeKind::Leaf(entries) => {
                results.extend(entries.iter().filter(|e| query.contains(&e.envelope)));
            }
            NodeKind::Internal(children) => {
                for &child in children {
                    self.contained_recursive(child, query, results);
                }
            }
        }
    }

    /// Finds the entries lying entirely inside `envelope`.
    pub fn find_contained(&self, envelope: &Envelope) -> Vec<&Entry<P>> {
        let mut results = Vec::new();
        self.contained_recursive(self.root, envelope, &mut results);
        results
    }

    /// Feature ids of the entries intersecting `envelope`.
    pub fn search_ids(&self, envelope: &Envelope) -> Vec<FeatureId> {
        self.search(envelope).into_iter().map(|e| e.feature_id).collect()
    }

    /// Iterates over every entry, depth first.
    pub fn iter(&self) -> Iter<'_, P> {
        Iter {
            index: self,
            stack: vec![self.root],
            current: Default::default(),
        }
    }

    /// Number of levels; a lone root leaf counts as one.
    pub fn height(&self) -> u32 {
        let mut height = 1;
        let mut idx = self.root;
        while let NodeKind::Internal(children) = &self.node(idx).kind {
            height += 1;
            idx = children[0];
        }
        height
    }

    pub fn stats(&self) -> RTreeStats {
        let live = self.nodes.iter().flatten();
        let (nodes, leaves) = live.fold((0u64, 0u64), |(n, l), node| {
            (n + 1, l + u64::from(node.is_leaf()))
        });
        RTreeStats {
            entries: self.size as u64,
            nodes,
            leaves,
            height: self.height(),
        }
    }

    /// Walks the tree and checks fanout bounds, tight envelopes, parent
    /// links, leaf depth and the size counter.
    pub fn check_integrity(&self) -> IntegrityReport {
        let mut report = IntegrityReport::new();

        if self.node(self.root).parent.is_some() {
            report.fail(format!("root {:?} has a parent link", self.root));
        }

        let mut leaf_depth = None;
        self.check_node(self.root, 1, &mut leaf_depth, &mut report);

        if report.entries_counted != self.size as u64 {
            report.fail(format!(
                "size counter is {} but {} entries are stored",
                self.size, report.entries_counted
            ));
        }

        let live = self.nodes.iter().flatten().count() as u64;
        if live != report.nodes_checked {
            report.fail(format!(
                "{} live arena nodes but {} reachable from the root",
                live, report.nodes_checked
            ));
        }
        report
    }

    fn check_node(&self, idx: NodeIdx, depth: u32, leaf_depth: &mut Option<u32>, report: &mut IntegrityReport) {
        let node = self.node(idx);
        report.nodes_checked += 1;

        let len = node.len();
        let is_root = idx == self.root;
        if len > self.config.max_entries {
            report.fail(format!("node {:?} holds {} children, above the maximum", idx, len));
        }
        if !is_root && len < self.config.min_entries {
            report.fail(format!("node {:?} holds {} children, below the minimum", idx, len));
        }
        if is_root && !node.is_leaf() && len < 2 {
            report.fail(format!("internal root {:?} holds {} children", idx, len));
        }

        let expected = if node.is_empty() {
            Envelope::world()
        } else {
            self.children_envelope(idx)
        };
        if node.envelope != expected {
            report.fail(format!(
                "node {:?} envelope {} differs from its children union {}",
                idx, node.envelope, expected
            ));
        }

        match &node.kind {
            NodeKind::Leaf(entries) => {
                report.entries_counted += entries.len() as u64;
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(d) if d != depth => {
                        report.fail(format!("leaf {:?} at depth {}, expected {}", idx, depth, d));
                    }
                    Some(_) => {}
                }
            }
            NodeKind::Internal(children) => {
                for &child in children {
                    if self.node(child).parent != Some(idx) {
                        report.fail(format!("node {:?} does not point back to parent {:?}", child, idx));
                    }
                    self.check_node(child, depth + 1, leaf_depth, report);
                }
            }
        }
    }
}

/// Moves the items at `first` and `second` positions into two vectors.
fn distribute<T>(items: Vec<T>, first: &[usize], second: &[usize]) -> (Vec<T>, Vec<T>) {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut take = |positions: &[usize]| -> Vec<T> {
        positions.iter().filter_map(|&p| slots[p].take()).collect()
    };
    let kept = take(first);
    let moved = take(second);
    debug_assert!(slots.iter().all(Option::is_none), "split lost children");
    (kept, moved)
}

/// Depth-first iterator over the entries of a [`SpatialIndex`].
pub struct Iter<'a, P> {
    index: &'a SpatialIndex<P>,
    stack: Vec<NodeIdx>,
    current: std::slice::Iter<'a, Entry<P>>,
}

impl<'a, P> Iterator for Iter<'a, P> {
    type Item = &'a Entry<P>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                return Some(entry);
            }
            let idx = self.stack.pop()?;
            match &self.index.node(idx).kind {
                NodeKind::Leaf(entries) => self.current = entries.iter(),
                NodeKind::Internal(children) => self.stack.extend(children.iter().rev()),
            }
        }
    }
}

impl<'a, P> IntoIterator for &'a SpatialIndex<P> {
    type Item = &'a Entry<P>;
    type IntoIter = Iter<'a, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// FeatureIndex Trait Implementation
// ============================================================================

impl<P> FeatureIndex<P> for SpatialIndex<P> {
    /// # Panics
    ///
    /// Panics if `envelope` is uninitialized.
    fn insert(&mut self, feature_id: FeatureId, envelope: Envelope, payload: P) -> EntryHandle {
        assert!(envelope.is_init(), "cannot index feature {} without an envelope", feature_id);

        let entry = Entry::new(feature_id, envelope, payload);
        let handle = entry.handle();
        self.insert_entry(entry);
        self.size += 1;
        self.mark_dirty();

        log::trace!("Inserted feature {} at {}", feature_id, envelope);
        handle
    }

    fn get(&self, feature_id: FeatureId) -> Option<&Entry<P>> {
        let (leaf, pos) = self.find_leaf(self.root, feature_id)?;
        match &self.node(leaf).kind {
            NodeKind::Leaf(entries) => entries.get(pos),
            NodeKind::Internal(_) => None,
        }
    }

    fn remove(&mut self, feature_id: FeatureId) -> Option<Entry<P>> {
        let (leaf, pos) = self.find_leaf(self.root, feature_id)?;
        let entry = match &mut self.node_mut(leaf).kind {
            NodeKind::Leaf(entries) => entries.remove(pos),
            NodeKind::Internal(_) => unreachable!("find_leaf returned an internal node"),
        };
        self.size -= 1;
        self.mark_dirty();
        self.condense_tree(leaf);

        log::trace!("Removed feature {}", feature_id);
        Some(entry)
    }

    fn change_id(&mut self, old_id: FeatureId, new_id: FeatureId) -> bool {
        let Some((leaf, pos)) = self.find_leaf(self.root, old_id) else {
            return false;
        };
        if let NodeKind::Leaf(entries) = &mut self.node_mut(leaf).kind {
            entries[pos].feature_id = new_id;
        }
        self.mark_dirty();
        true
    }

    fn search(&self, envelope: &Envelope) -> Vec<&Entry<P>> {
        let mut results = Vec::new();
        self.search_recursive(self.root, envelope, &mut results);
        results
    }

    fn get_all(&self) -> Vec<&Entry<P>> {
        self.iter().collect()
    }

    fn size(&self) -> usize {
        self.size
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free_nodes.clear();
        self.nodes.push(Some(Node::leaf(Envelope::world(), None)));
        self.root = NodeIdx::new(0);
        self.size = 0;
        self.mark_dirty();
    }
}

impl<P> SpatialIndex<P> {
    pub(super) fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

// ============================================================================
// Tests
// ============================================================================
