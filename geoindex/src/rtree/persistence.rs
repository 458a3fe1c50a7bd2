//! Binary persistence for the R-Tree.
//!
//! Records are encoded with bincode's legacy configuration: little-endian,
//! fixed-width integers, one byte per boolean. The file is laid out as
//!
//! ```text
//! header : magic u32 | version u32 | max_entries i32 | min_entries i32
//!          | size i32 | seed_picker u8
//! node   : is_internal bool | is_leaf bool | min_x f64 | min_y f64
//!          | max_x f64 | max_y f64 | child_count i32 | children...
//! entry  : min_x f64 | min_y f64 | max_x f64 | max_y f64 | feature_id i64
//!          | payload
//! ```
//!
//! Nodes are written depth first starting at the root. The children of an
//! internal node are nodes, the children of a leaf are entries. The payload is
//! the bincode encoding of the entry payload, which is empty for `()`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::atomic::Ordering;

use crate::envelope::Envelope;

use super::config::{IndexConfig, SeedPicker};
use super::rtree_constants::{MAGIC, VERSION};
use super::rtree_impl::SpatialIndex;
use super::rtree_types::{Entry, IndexError, IndexResult, Node, NodeIdx, NodeKind};

/// Upper bound for a single decoded record, guards against absurd lengths
/// in damaged payloads.
const DECODE_LIMIT: usize = 64 * 1024 * 1024;

/// Deeper trees than this cannot come out of a valid save.
const MAX_DEPTH: usize = 64;

/// Child vectors are preallocated up to this many slots; a node announcing
/// more grows as its records actually arrive.
const PREALLOC_LIMIT: usize = 1024;

#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    magic: u32,
    version: u32,
    max_entries: i32,
    min_entries: i32,
    size: i32,
    seed_picker: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    is_internal: bool,
    is_leaf: bool,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    child_count: i32,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    feature_id: i64,
}

fn encode<T: Serialize + ?Sized, W: Write>(value: &T, writer: &mut W) -> IndexResult<()> {
    bincode::serde::encode_into_std_write(value, writer, bincode::config::legacy())?;
    Ok(())
}

fn decode<T: DeserializeOwned, R: Read>(reader: &mut R) -> IndexResult<T> {
    let config = bincode::config::legacy().with_limit::<DECODE_LIMIT>();
    Ok(bincode::serde::decode_from_std_read(reader, config)?)
}

fn to_i32(value: usize, what: &str) -> IndexResult<i32> {
    i32::try_from(value)
        .map_err(|_| IndexError::Serialization(format!("{} {} does not fit the file format", what, value)))
}

fn to_usize(value: i32, what: &str) -> IndexResult<usize> {
    usize::try_from(value).map_err(|_| IndexError::Corrupted(format!("negative {}: {}", what, value)))
}

impl<P: Serialize + DeserializeOwned> SpatialIndex<P> {
    /// Writes the index to `path`.
    ///
    /// Skipped when nothing changed since the last successful save or load
    /// of the same path.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Io`] if the file cannot be written and
    /// [`IndexError::Serialization`] if a payload cannot be encoded.
    pub fn save(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        let path = path.as_ref();
        let mut saved_path = self.saved_path.lock();

        if !self.is_dirty() && saved_path.as_deref() == Some(path) {
            log::debug!("Spatial index unchanged since last save to {:?}, skipping", path);
            return Ok(());
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = FileHeader {
            magic: MAGIC,
            version: VERSION,
            max_entries: to_i32(self.config.max_entries, "max_entries")?,
            min_entries: to_i32(self.config.min_entries, "min_entries")?,
            size: to_i32(self.size, "size")?,
            seed_picker: self.config.seed_picker.to_tag(),
        };
        encode(&header, &mut writer)?;
        self.write_node(self.root, &mut writer)?;

        writer.flush()?;
        writer.get_ref().sync_all()?;

        self.dirty.store(false, Ordering::Release);
        *saved_path = Some(path.to_path_buf());

        log::debug!("Saved spatial index with {} entries to {:?}", self.size, path);
        Ok(())
    }

    fn write_node<W: Write>(&self, idx: NodeIdx, writer: &mut W) -> IndexResult<()> {
        let node = self.node(idx);
        let record = NodeRecord {
            is_internal: !node.is_leaf(),
            is_leaf: node.is_leaf(),
            min_x: node.envelope.min_x,
            min_y: node.envelope.min_y,
            max_x: node.envelope.max_x,
            max_y: node.envelope.max_y,
            child_count: to_i32(node.len(), "child count")?,
        };
        encode(&record, writer)?;

        match &node.kind {
            NodeKind::Leaf(entries) => {
                for entry in entries {
                    let record = EntryRecord {
                        min_x: entry.envelope.min_x,
                        min_y: entry.envelope.min_y,
                        max_x: entry.envelope.max_x,
                        max_y: entry.envelope.max_y,
                        feature_id: entry.feature_id,
                    };
                    encode(&record, writer)?;
                    encode(&entry.payload, writer)?;
                }
            }
            NodeKind::Internal(children) => {
                for &child in children {
                    self.write_node(child, writer)?;
                }
            }
        }
        Ok(())
    }

    /// Replaces the whole index with the tree stored at `path`.
    ///
    /// The file is decoded and validated completely before anything is
    /// replaced; on error the current tree is left as it was. The fanout of
    /// the loaded tree comes from the file header, the split seed from the
    /// current configuration.
    ///
    /// # Errors
    ///
    /// - [`IndexError::Io`] if the file cannot be read or ends early
    /// - [`IndexError::Serialization`] if a record cannot be decoded
    /// - [`IndexError::Corrupted`] if the records are inconsistent or the
    ///   tree they describe breaks a structural invariant
    pub fn load(&mut self, path: impl AsRef<Path>) -> IndexResult<()> {
        let path = path.as_ref();
        let loaded = match self.read_tree(path) {
            Ok(loaded) => loaded,
            Err(err) => {
                log::warn!("Rejected spatial index file {:?}: {}", path, err);
                return Err(err);
            }
        };

        self.config = loaded.config;
        self.nodes = loaded.nodes;
        self.free_nodes.clear();
        self.root = NodeIdx::new(0);
        self.size = loaded.size;
        *self.dirty.get_mut() = false;
        *self.saved_path.get_mut() = Some(path.to_path_buf());

        log::debug!(
            "Loaded spatial index with {} entries ({} nodes) from {:?}",
            self.size,
            self.nodes.len(),
            path
        );
        Ok(())
    }

    fn read_tree(&self, path: &Path) -> IndexResult<SpatialIndex<P>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let header: FileHeader = decode(&mut reader)?;
        if header.magic != MAGIC {
            return Err(IndexError::Corrupted(format!(
                "bad magic {:#010x}",
                header.magic
            )));
        }
        if header.version != VERSION {
            return Err(IndexError::Corrupted(format!(
                "unsupported format version {}",
                header.version
            )));
        }

        let seed_picker = SeedPicker::from_tag(header.seed_picker).ok_or_else(|| {
            IndexError::Corrupted(format!("unknown seed picker tag {}", header.seed_picker))
        })?;
        let config = IndexConfig {
            max_entries: to_usize(header.max_entries, "max_entries")?,
            min_entries: to_usize(header.min_entries, "min_entries")?,
            seed_picker,
            split_seed: self.config.split_seed,
        };
        config
            .validate()
            .map_err(|err| IndexError::Corrupted(format!("header fanout: {}", err)))?;
        let size = to_usize(header.size, "size")?;

        let mut nodes = Vec::new();
        let mut entries_read = 0;
        read_node(
            &mut reader,
            &mut nodes,
            None,
            config.max_entries,
            0,
            &mut entries_read,
        )?;

        if entries_read != size {
            return Err(IndexError::Corrupted(format!(
                "header announces {} entries but {} were stored",
                size, entries_read
            )));
        }
        if !reader.fill_buf()?.is_empty() {
            return Err(IndexError::Corrupted("trailing data after root node".into()));
        }

        let mut loaded = SpatialIndex::from_valid_config(config);
        loaded.nodes = nodes;
        loaded.size = size;

        let report = loaded.check_integrity();
        if !report.is_valid {
            return Err(IndexError::Corrupted(format!(
                "inconsistent tree ({} problems): {}",
                report.errors.len(),
                report.errors.iter().take(3).cloned().collect::<Vec<_>>().join("; ")
            )));
        }
        Ok(loaded)
    }
}

/// Decodes one node and its subtree into `nodes`, returning its slot.
fn read_node<P: DeserializeOwned, R: Read>(
    reader: &mut R,
    nodes: &mut Vec<Option<Node<P>>>,
    parent: Option<NodeIdx>,
    max_entries: usize,
    depth: usize,
    entries_read: &mut usize,
) -> IndexResult<NodeIdx> {
    if depth > MAX_DEPTH {
        return Err(IndexError::Corrupted(format!("tree deeper than {} levels", MAX_DEPTH)));
    }

    let record: NodeRecord = decode(reader)?;
    let child_count = to_usize(record.child_count, "child count")?;
    if child_count > max_entries {
        return Err(IndexError::Corrupted(format!(
            "node holds {} children, maximum is {}",
            child_count, max_entries
        )));
    }

    let idx = NodeIdx::new(nodes.len());
    nodes.push(None);

    let kind = match (record.is_internal, record.is_leaf) {
        (false, true) => {
            let mut entries = Vec::with_capacity(child_count.min(PREALLOC_LIMIT));
            for _ in 0..child_count {
                let record: EntryRecord = decode(reader)?;
                let payload: P = decode(reader)?;
                entries.push(Entry::new(
                    record.feature_id,
                    Envelope::new(record.min_x, record.max_x, record.min_y, record.max_y),
                    payload,
                ));
            }
            *entries_read += child_count;
            NodeKind::Leaf(entries)
        }
        (true, false) => {
            if child_count == 0 {
                return Err(IndexError::Corrupted("internal node without children".into()));
            }
            let mut children = Vec::with_capacity(child_count.min(PREALLOC_LIMIT));
            for _ in 0..child_count {
                children.push(read_node(
                    reader,
                    nodes,
                    Some(idx),
                    max_entries,
                    depth + 1,
                    entries_read,
                )?);
            }
            NodeKind::Internal(children)
        }
        (is_internal, is_leaf) => {
            return Err(IndexError::Corrupted(format!(
                "invalid node flags (internal: {}, leaf: {})",
                is_internal, is_leaf
            )));
        }
    };

    nodes[idx.get()] = Some(Node {
        envelope: Envelope::new(record.min_x, record.max_x, record.min_y, record.max_y),
        parent,
        kind,
    });
    Ok(idx)
}
