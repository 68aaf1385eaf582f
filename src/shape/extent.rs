use crate::math::{Isometry3, Point3, TOLERANCE};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Creates a box from its corner coordinates.
    #[must_use]
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self {
            min: Point3::from(min),
            max: Point3::from(max),
        }
    }

    /// Creates a box centred on the origin with the given half-lengths.
    #[must_use]
    pub fn symmetric(hx: f64, hy: f64, hz: f64) -> Self {
        Self::new([-hx, -hy, -hz], [hx, hy, hz])
    }

    /// Returns the eight corners of the box.
    #[must_use]
    pub fn corners(&self) -> [Point3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Point3::new(lo.x, lo.y, lo.z),
            Point3::new(hi.x, lo.y, lo.z),
            Point3::new(lo.x, hi.y, lo.z),
            Point3::new(hi.x, hi.y, lo.z),
            Point3::new(lo.x, lo.y, hi.z),
            Point3::new(hi.x, lo.y, hi.z),
            Point3::new(lo.x, hi.y, hi.z),
            Point3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Returns the axis-aligned box enclosing this box after a rigid transform.
    #[must_use]
    pub fn transformed(&self, transform: &Isometry3) -> Self {
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for corner in self.corners() {
            let p = transform * corner;
            min = min.inf(&p);
            max = max.sup(&p);
        }
        Self { min, max }
    }

    /// Returns the smallest box enclosing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Returns `true` if `other` lies inside this box, up to [`TOLERANCE`] scaled by size.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        let slack = TOLERANCE * (1.0 + (self.max - self.min).amax());
        (0..3).all(|i| other.min[i] >= self.min[i] - slack && other.max[i] <= self.max[i] + slack)
    }
}
