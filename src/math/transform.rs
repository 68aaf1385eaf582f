use nalgebra::{Translation3, UnitQuaternion};

use super::{Isometry3, Rotation3, Vector3};

/// Builds a rotation from angles about the X, Y and Z axes, in radians.
///
/// The rotations are applied in sequence: first about X, then Y, then Z,
/// i.e. the resulting matrix is `Rz * Ry * Rx`.
#[must_use]
pub fn euler_rotation(rx: f64, ry: f64, rz: f64) -> Rotation3 {
    Rotation3::from_euler_angles(rx, ry, rz)
}

/// Builds the rigid transform of a placement from its position and rotation.
#[must_use]
pub fn placement(position: Vector3, rotation: Rotation3) -> Isometry3 {
    Isometry3::from_parts(
        Translation3::from(position),
        UnitQuaternion::from_rotation_matrix(&rotation),
    )
}

/// Composes an outer transform with one expressed in its frame.
///
/// The result maps points of the inner frame straight to the outer parent frame.
#[must_use]
pub fn compose(outer: &Isometry3, inner: &Isometry3) -> Isometry3 {
    outer * inner
}
