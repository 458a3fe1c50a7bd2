use serde::{Deserialize, Serialize};

/// Half-extent of the planar projection used by the map layers
/// (spherical Web-Mercator), in metres.
pub const WORLD_BOUND: f64 = 20_037_508.34;

/// An axis-aligned bounding rectangle.
///
/// An `Envelope` is either *initialized*, in which case it describes the
/// rectangle `[min_x, max_x] x [min_y, max_y]`, or *uninitialized*, the
/// identity element of [`merge`](Envelope::merge). Every spatial query of the
/// index is expressed through the operations on this type.
///
/// Note the argument order of [`Envelope::new`]: both bounds of the X axis
/// come first, then both bounds of the Y axis.
///
/// # Examples
///
/// ```rust
/// use geoindex::Envelope;
///
/// let mut env = Envelope::new(0.0, 10.0, 0.0, 10.0);
/// env.merge(&Envelope::new(5.0, 15.0, 5.0, 15.0));
/// assert_eq!(env, Envelope::new(0.0, 15.0, 0.0, 15.0));
///
/// // Touching edges count as intersecting.
/// assert!(env.intersects(&Envelope::new(15.0, 20.0, 15.0, 20.0)));
/// ```
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Minimum X coordinate
    pub min_x: f64,
    /// Maximum X coordinate
    pub max_x: f64,
    /// Minimum Y coordinate
    pub min_y: f64,
    /// Maximum Y coordinate
    pub max_y: f64,
    initialized: bool,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.initialized {
            write!(
                f,
                "Envelope({}, {}, {}, {})",
                self.min_x, self.max_x, self.min_y, self.max_y
            )
        } else {
            write!(f, "Envelope(empty)")
        }
    }
}

impl Envelope {
    /// Creates an initialized envelope from its X range and its Y range.
    ///
    /// Reversed bounds are kept as given; call [`fix`](Envelope::fix) to
    /// normalize them.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            initialized: true,
        }
    }

    /// Creates an uninitialized envelope.
    pub fn empty() -> Self {
        Self {
            min_x: 0.0,
            max_x: 0.0,
            min_y: 0.0,
            max_y: 0.0,
            initialized: false,
        }
    }

    /// The degenerate envelope of a single point.
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(x, x, y, y)
    }

    /// The full extent of the planar projection, `±WORLD_BOUND` on both axes.
    pub fn world() -> Self {
        Self::new(-WORLD_BOUND, WORLD_BOUND, -WORLD_BOUND, WORLD_BOUND)
    }

    pub fn is_init(&self) -> bool {
        self.initialized
    }

    /// Swaps reversed bounds so that `min <= max` holds on both axes.
    pub fn fix(&mut self) {
        if self.min_x > self.max_x {
            std::mem::swap(&mut self.min_x, &mut self.max_x);
        }
        if self.min_y > self.max_y {
            std::mem::swap(&mut self.min_y, &mut self.max_y);
        }
    }

    /// Grows this envelope to cover `other` as well.
    ///
    /// Merging into an uninitialized envelope copies `other`; merging an
    /// uninitialized `other` changes nothing.
    pub fn merge(&mut self, other: &Envelope) {
        if !other.initialized {
            return;
        }
        if !self.initialized {
            *self = *other;
            return;
        }
        self.min_x = self.min_x.min(other.min_x);
        self.max_x = self.max_x.max(other.max_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Returns the union of this envelope and `other`.
    pub fn union(&self, other: &Envelope) -> Envelope {
        let mut merged = *self;
        merged.merge(other);
        merged
    }

    /// Inclusive overlap test on both axes. Rectangles that only share an
    /// edge or a corner intersect.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.initialized
            && other.initialized
            && self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Returns the overlapping rectangle, if any.
    pub fn intersection(&self, other: &Envelope) -> Option<Envelope> {
        if !self.intersects(other) {
            return None;
        }
        Some(Envelope::new(
            self.min_x.max(other.min_x),
            self.max_x.min(other.max_x),
            self.min_y.max(other.min_y),
            self.max_y.min(other.max_y),
        ))
    }

    /// Checks if `other` lies entirely inside this envelope (edges included).
    pub fn contains(&self, other: &Envelope) -> bool {
        self.initialized
            && other.initialized
            && other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.initialized
            && x >= self.min_x
            && x <= self.max_x
            && y >= self.min_y
            && y <= self.max_y
    }

    pub fn width(&self) -> f64 {
        if self.initialized {
            self.max_x - self.min_x
        } else {
            0.0
        }
    }

    pub fn height(&self) -> f64 {
        if self.initialized {
            self.max_y - self.min_y
        } else {
            0.0
        }
    }

    /// Width times height; zero for an uninitialized envelope.
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Area that has to be added to this envelope so that it covers `other`.
    pub fn enlargement(&self, other: &Envelope) -> f64 {
        self.union(other).area() - self.area()
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn is_point(&self) -> bool {
        self.initialized && self.min_x == self.max_x && self.min_y == self.max_y
    }
}
