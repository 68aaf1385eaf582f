use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for a geometry build.
///
/// Every variant is fatal: the build is aborted and no root handle is produced.
/// Recoverable conditions are reported as [`crate::report::BuildWarning`] instead.
#[derive(Debug, Error)]
pub enum DetgeomError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Volume(#[from] VolumeError),
}

/// Errors related to reading the declarative description.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse {origin}: {source}")]
    Json {
        origin: String,
        source: serde_json::Error,
    },

    #[error("record `{record}` is missing required field `{field}`")]
    MissingField { record: String, field: &'static str },

    #[error("record `{record}` has an invalid `{field}`: {reason}")]
    InvalidValue {
        record: String,
        field: String,
        reason: String,
    },

    #[error("record `{record}` has unsupported shape type `{kind}`")]
    UnknownShapeType { record: String, kind: String },

    #[error("unknown {quantity} unit `{unit}`")]
    UnknownUnit { quantity: &'static str, unit: String },
}

/// Errors related to material resolution.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("reference material `{0}` is not in the material library")]
    UnknownReferenceMaterial(String),

    #[error("invalid material `{material}`: {reason}")]
    InvalidMaterialSpec { material: String, reason: String },
}

/// Errors related to shape construction.
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("shape `{shape}` is missing required dimension `{field}`")]
    MissingDimension { shape: String, field: &'static str },

    #[error("shape `{shape}` references `{reference}`, which has not been built")]
    UnresolvedShapeReference { shape: String, reference: String },

    #[error("shape `{shape}` references itself through {}", chain.join(" -> "))]
    CyclicShapeReference { shape: String, chain: Vec<String> },

    #[error("shape `{shape}` has invalid z-planes ({reason}): z = {z:?}, rmin = {rmin:?}, rmax = {rmax:?}")]
    InvalidPlanes {
        shape: String,
        reason: String,
        z: Vec<f64>,
        rmin: Vec<f64>,
        rmax: Vec<f64>,
    },

    #[error("shape `{shape}` is degenerate: {reason}")]
    Degenerate { shape: String, reason: String },
}

/// Errors related to logical volumes and assemblies.
#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("assembly `{assembly}` references unknown volume `{volume}`")]
    UnknownComponentVolume { assembly: String, volume: String },

    #[error("placement references unknown volume `{0}`")]
    UnknownVolume(String),

    #[error("entity not found: {0}")]
    EntityNotFound(&'static str),
}

/// Convenience type alias for results using [`DetgeomError`].
pub type Result<T> = std::result::Result<T, DetgeomError>;
