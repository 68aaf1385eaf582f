pub mod transform;
pub mod units;

pub use transform::{compose, euler_rotation, placement};
pub use units::{AngleUnit, DensityUnit, LengthUnit, TemperatureUnit};

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Rotation matrix type.
pub type Rotation3 = nalgebra::Rotation3<f64>;

/// Rigid transform (rotation followed by translation).
pub type Isometry3 = nalgebra::Isometry3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;
