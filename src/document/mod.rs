//! Serde model of the JSON geometry and materials documents.
//!
//! Volume records are kept as loose JSON objects: their fields depend on the
//! shape type and are read through [`RecordView`] while the typed description
//! is produced.

mod fields;

pub use fields::RecordView;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::InputError;

/// A geometry document: the world, the volumes placed in it, and optional
/// inline materials and hits-collection declarations.
#[derive(Debug, Clone, Deserialize)]
pub struct GeometryDocument {
    pub world: VolumeRecord,
    #[serde(default)]
    pub volumes: Vec<VolumeRecord>,
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialRecord>,
    #[serde(default, rename = "hitsCollections")]
    pub hits_collections: Vec<HitsCollectionRecord>,
}

impl GeometryDocument {
    /// Parses a geometry document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid geometry document.
    pub fn from_json(text: &str, origin: &str) -> Result<Self, InputError> {
        serde_json::from_str(text).map_err(|source| InputError::Json {
            origin: origin.to_owned(),
            source,
        })
    }

    /// Reads and parses a geometry document from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, InputError> {
        Self::from_json(&read(path)?, &path.display().to_string())
    }
}

/// A document holding only volume records, used for external imports.
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalDocument {
    #[serde(default)]
    pub volumes: Vec<VolumeRecord>,
}

impl ExternalDocument {
    /// Reads and parses an external geometry file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, InputError> {
        serde_json::from_str(&read(path)?).map_err(|source| InputError::Json {
            origin: path.display().to_string(),
            source,
        })
    }
}

/// A standalone materials document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialsDocument {
    #[serde(default)]
    pub materials: BTreeMap<String, MaterialRecord>,
}

impl MaterialsDocument {
    /// Parses a materials document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid materials document.
    pub fn from_json(text: &str, origin: &str) -> Result<Self, InputError> {
        serde_json::from_str(text).map_err(|source| InputError::Json {
            origin: origin.to_owned(),
            source,
        })
    }

    /// Reads and parses a materials document from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, InputError> {
        Self::from_json(&read(path)?, &path.display().to_string())
    }
}

/// Material kind as written in documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKindRecord {
    #[serde(alias = "nist")]
    Reference,
    #[serde(alias = "element_based")]
    Compound,
}

/// A material entry of a materials map.
#[derive(Debug, Clone, Deserialize)]
pub struct MaterialRecord {
    #[serde(rename = "type")]
    pub kind: MaterialKindRecord,
    /// Library name of a reference material.
    pub name: Option<String>,
    pub density: Option<f64>,
    pub density_unit: Option<String>,
    pub state: Option<String>,
    pub temperature: Option<f64>,
    pub temperature_unit: Option<String>,
    #[serde(default)]
    pub composition: BTreeMap<String, u32>,
}

/// An informational hits-collection declaration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HitsCollectionRecord {
    pub name: String,
    #[serde(default)]
    pub volumes: Vec<String>,
}

/// A volume record, kept as a loose JSON object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct VolumeRecord {
    pub fields: Map<String, Value>,
}

impl VolumeRecord {
    /// Returns the record's `name` field, if it is a string.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }
}

fn read(path: &Path) -> Result<String, InputError> {
    std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })
}
