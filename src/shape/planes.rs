use tracing::debug;

use crate::error::{Result, ShapeError};

/// The z-planes of a solid of revolution, as three parallel arrays.
///
/// Lengths are in millimetres. Plane `i` is the circle (or polygon) pair of
/// radii `rmin[i]..rmax[i]` at height `z[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ZPlanes {
    pub z: Vec<f64>,
    pub rmin: Vec<f64>,
    pub rmax: Vec<f64>,
}

impl ZPlanes {
    /// Creates a plane set from parallel arrays; no validation happens here.
    #[must_use]
    pub fn new(z: Vec<f64>, rmin: Vec<f64>, rmax: Vec<f64>) -> Self {
        Self { z, rmin, rmax }
    }

    /// Sorts the planes by ascending z if needed, then validates them.
    ///
    /// The three arrays are permuted together, so a plane set supplied in any
    /// order yields the same result as the ascending one.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::InvalidPlanes`] if the arrays differ in length,
    /// fewer than two planes are given, a value is not finite, or any plane
    /// violates `0 <= rmin < rmax`.
    pub fn normalized(self, shape: &str) -> Result<Self> {
        let Self { z, rmin, rmax } = self;
        let invalid = |reason: &str, z: Vec<f64>, rmin: Vec<f64>, rmax: Vec<f64>| {
            ShapeError::InvalidPlanes {
                shape: shape.to_owned(),
                reason: reason.to_owned(),
                z,
                rmin,
                rmax,
            }
        };

        if z.len() != rmin.len() || z.len() != rmax.len() {
            return Err(invalid("array lengths differ", z, rmin, rmax).into());
        }
        if z.iter().chain(&rmin).chain(&rmax).any(|v| !v.is_finite()) {
            return Err(invalid("non-finite value", z, rmin, rmax).into());
        }

        let (z, rmin, rmax) = if z.windows(2).all(|w| w[0] <= w[1]) {
            (z, rmin, rmax)
        } else {
            debug!(shape, ?z, "z-planes not ascending, sorting");
            let mut order: Vec<usize> = (0..z.len()).collect();
            order.sort_by(|&a, &b| z[a].total_cmp(&z[b]));
            (
                order.iter().map(|&i| z[i]).collect(),
                order.iter().map(|&i| rmin[i]).collect(),
                order.iter().map(|&i| rmax[i]).collect(),
            )
        };

        if z.len() < 2 {
            return Err(invalid("at least two planes are required", z, rmin, rmax).into());
        }
        if let Some(i) = (0..z.len()).find(|&i| rmin[i] < 0.0 || rmin[i] >= rmax[i]) {
            let reason = format!("plane {i} at z = {} violates 0 <= rmin < rmax", z[i]);
            return Err(invalid(&reason, z, rmin, rmax).into());
        }

        Ok(Self { z, rmin, rmax })
    }

    /// Returns the number of planes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.z.len()
    }

    /// Returns `true` if there are no planes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    /// Returns the lowest and highest z, assuming the planes are normalized.
    #[must_use]
    pub fn z_range(&self) -> (f64, f64) {
        (
            self.z.first().copied().unwrap_or(0.0),
            self.z.last().copied().unwrap_or(0.0),
        )
    }

    /// Returns the largest outer radius.
    #[must_use]
    pub fn max_radius(&self) -> f64 {
        self.rmax.iter().copied().fold(0.0, f64::max)
    }
}
