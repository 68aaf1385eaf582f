pub mod assembly;
pub mod description;
pub mod detector;
pub mod document;
pub mod error;
pub mod material;
pub mod math;
pub mod placement;
pub mod report;
pub mod sensitivity;
pub mod shape;
pub mod store;
pub mod volume;

pub use description::GeometryDescription;
pub use detector::{build_geometry, BuildOptions, BuiltGeometry, Detector};
pub use error::{DetgeomError, Result};
pub use material::{MaterialLibrary, NistLibrary};
pub use report::BuildWarning;
pub use store::GeometryStore;
