//! Core types and data structures for the in-memory R-Tree.
//!
//! This module defines the fundamental types used throughout the R-Tree:
//! - Error types and result types
//! - Entries stored at the leaf level
//! - Arena nodes (Leaf and Internal)
//! - Statistics structures

use crate::envelope::Envelope;
use std::io;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in spatial index operations
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupted index file: {0}")]
    Corrupted(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<bincode::error::EncodeError> for IndexError {
    fn from(err: bincode::error::EncodeError) -> Self {
        match err {
            bincode::error::EncodeError::Io { inner, .. } => IndexError::Io(inner),
            other => IndexError::Serialization(other.to_string()),
        }
    }
}

impl From<bincode::error::DecodeError> for IndexError {
    fn from(err: bincode::error::DecodeError) -> Self {
        match err {
            bincode::error::DecodeError::Io { inner, .. } => IndexError::Io(inner),
            other => IndexError::Serialization(other.to_string()),
        }
    }
}

/// Result type for spatial index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Caller-supplied feature identifier. Not checked for uniqueness.
pub type FeatureId = i64;

// ============================================================================
// Entries
// ============================================================================

/// A feature stored at the leaf level: its id, its envelope and whatever
/// payload the index carries per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<P = ()> {
    pub feature_id: FeatureId,
    pub envelope: Envelope,
    pub payload: P,
}

impl<P> Entry<P> {
    pub fn new(feature_id: FeatureId, envelope: Envelope, payload: P) -> Self {
        Self {
            feature_id,
            envelope,
            payload,
        }
    }

    pub fn handle(&self) -> EntryHandle {
        EntryHandle {
            feature_id: self.feature_id,
            envelope: self.envelope,
        }
    }
}

/// Lightweight copy of what was inserted, returned by `insert`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryHandle {
    pub feature_id: FeatureId,
    pub envelope: Envelope,
}

// ============================================================================
// Node Types
// ============================================================================

/// Position of a node inside the index arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeIdx(usize);

impl NodeIdx {
    pub(crate) const fn new(i: usize) -> Self {
        Self(i)
    }

    pub(crate) const fn get(self) -> usize {
        self.0
    }
}

/// Children of a node: entries for leaves, arena links for internal nodes.
#[derive(Debug, Clone)]
pub(crate) enum NodeKind<P> {
    Leaf(Vec<Entry<P>>),
    Internal(Vec<NodeIdx>),
}

/// A node of the tree. `parent` is a non-owning back link used by the
/// upward passes of insertion and deletion.
#[derive(Debug, Clone)]
pub(crate) struct Node<P> {
    pub(crate) envelope: Envelope,
    pub(crate) parent: Option<NodeIdx>,
    pub(crate) kind: NodeKind<P>,
}

impl<P> Node<P> {
    pub(crate) fn leaf(envelope: Envelope, parent: Option<NodeIdx>) -> Self {
        Self {
            envelope,
            parent,
            kind: NodeKind::Leaf(Vec::new()),
        }
    }

    pub(crate) fn internal(parent: Option<NodeIdx>, children: Vec<NodeIdx>) -> Self {
        Self {
            envelope: Envelope::empty(),
            parent,
            kind: NodeKind::Internal(children),
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub(crate) fn len(&self) -> usize {
        match &self.kind {
            NodeKind::Leaf(entries) => entries.len(),
            NodeKind::Internal(children) => children.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Shape of the tree at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RTreeStats {
    pub entries: u64,
    pub nodes: u64,
    pub leaves: u64,
    /// Number of levels, a lone root leaf counts as 1
    pub height: u32,
}

/// Result of walking the tree and checking its structural invariants
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// Total nodes visited
    pub nodes_checked: u64,
    /// Entries found at the leaf level
    pub entries_counted: u64,
    /// Summary of findings
    pub is_valid: bool,
    /// Detailed error messages
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn new() -> Self {
        Self {
            nodes_checked: 0,
            entries_counted: 0,
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }
}

impl Default for IntegrityReport {
    fn default() -> Self {
        Self::new()
    }
}
