//! Constants for the in-memory R-Tree and its file format.

/// Default maximum number of children per node
pub const DEFAULT_MAX_ENTRIES: usize = 8;

/// Default minimum number of children per non-root node
pub const DEFAULT_MIN_ENTRIES: usize = 2;

/// Magic number for file format identification
pub const MAGIC: u32 = 0x4752_5458; // "GRTX" - GIS R-Tree eXchange

/// File format version
pub const VERSION: u32 = 1;
