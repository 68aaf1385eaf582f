//! Physical placements and the work-queue placement resolver.

mod resolver;

pub use resolver::{PlacementResolver, Resolution};

use crate::assembly::AssemblyId;
use crate::math::{Isometry3, Vector3};
use crate::volume::VolumeId;

slotmap::new_key_type! {
    /// Unique identifier for a physical placement in the geometry store.
    pub struct PlacementId;
}

/// A positioned instance of a logical volume inside its mother volume.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicalVolume {
    pub name: String,
    pub volume: VolumeId,
    /// `None` only for the world.
    pub mother: Option<VolumeId>,
    /// Placement of the volume's frame in the mother's frame.
    pub transform: Isometry3,
    pub copy_number: u32,
    /// The assembly this placement was imprinted from, if any.
    pub assembly: Option<AssemblyId>,
}

/// Declarative placement of a volume (or assembly) under a parent volume.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementDef {
    /// Name of the placed volume, or of the assembly for imprints.
    pub volume: String,
    /// Name of the mother volume.
    pub parent: String,
    pub transform: Isometry3,
    /// Number of instances, at least one.
    pub copies: u32,
    /// Translation between consecutive instances, in the mother's frame.
    pub copy_offset: Vector3,
}

impl PlacementDef {
    /// Creates a single placement.
    #[must_use]
    pub fn new(volume: impl Into<String>, parent: impl Into<String>, transform: Isometry3) -> Self {
        Self {
            volume: volume.into(),
            parent: parent.into(),
            transform,
            copies: 1,
            copy_offset: Vector3::zeros(),
        }
    }

    /// Returns the transform of instance `index`: the base transform shifted
    /// by `copy_offset * index`.
    #[must_use]
    pub fn instance_transform(&self, index: u32) -> Isometry3 {
        let mut transform = self.transform;
        transform.translation.vector += self.copy_offset * f64::from(index);
        transform
    }
}

/// Lifecycle of one placement definition within a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementState {
    Pending,
    Placed,
    /// The parent never became placed; reported as a warning.
    UnresolvedParent,
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::{placement, Rotation3};

    #[test]
    fn instances_step_by_offset() {
        let mut def = PlacementDef::new(
            "Pmt",
            "World",
            placement(Vector3::new(1.0, 2.0, 3.0), Rotation3::identity()),
        );
        def.copies = 3;
        def.copy_offset = Vector3::new(0.0, 0.0, 10.0);

        assert_relative_eq!(def.instance_transform(0).translation.vector, Vector3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(def.instance_transform(2).translation.vector, Vector3::new(1.0, 2.0, 23.0));
    }
}
