//! The geometry side of the index boundary.
//!
//! The index never looks at feature shapes. Layer code hands it the bounding
//! envelope of each geometry, obtained through [`ComputeEnvelope`].

use crate::envelope::Envelope;

/// Anything that can report the rectangle it occupies.
pub trait ComputeEnvelope {
    fn compute_envelope(&self) -> Envelope;
}

impl ComputeEnvelope for Envelope {
    fn compute_envelope(&self) -> Envelope {
        *self
    }
}

/// A bare `(x, y)` coordinate.
impl ComputeEnvelope for (f64, f64) {
    fn compute_envelope(&self) -> Envelope {
        Envelope::point(self.0, self.1)
    }
}

/// A coordinate sequence (line string, ring or multipoint).
impl ComputeEnvelope for [(f64, f64)] {
    fn compute_envelope(&self) -> Envelope {
        self.iter().fold(Envelope::empty(), |mut env, point| {
            env.merge(&point.compute_envelope());
            env
        })
    }
}

impl ComputeEnvelope for Vec<(f64, f64)> {
    fn compute_envelope(&self) -> Envelope {
        self.as_slice().compute_envelope()
    }
}
