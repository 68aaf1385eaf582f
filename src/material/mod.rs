mod library;
mod registry;

pub use library::{MaterialLibrary, NistLibrary};
pub use registry::MaterialRegistry;

use std::str::FromStr;

use crate::document::{MaterialKindRecord, MaterialRecord};
use crate::error::InputError;
use crate::math::{DensityUnit, TemperatureUnit};

slotmap::new_key_type! {
    /// Unique identifier for a material in the geometry store.
    pub struct MaterialId;
}

/// Physical state of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialState {
    #[default]
    Undefined,
    Solid,
    Liquid,
    Gas,
}

impl FromStr for MaterialState {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solid" => Ok(Self::Solid),
            "liquid" => Ok(Self::Liquid),
            "gas" | "gaseous" => Ok(Self::Gas),
            "undefined" => Ok(Self::Undefined),
            other => Err(InputError::InvalidValue {
                record: "material".into(),
                field: "state".into(),
                reason: format!("unknown state `{other}`"),
            }),
        }
    }
}

/// A chemical element as provided by the material library.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Chemical symbol, e.g. `Xe`.
    pub symbol: String,
    /// Atomic number.
    pub z: u32,
    /// Molar mass in g/mol.
    pub molar_mass: f64,
}

/// One element of a compound together with its share of the compound.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementComponent {
    pub element: Element,
    /// Number of atoms of this element per formula unit.
    pub atoms: u32,
    /// Fraction of the compound's mass carried by this element.
    pub mass_fraction: f64,
}

/// How a material came to exist.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialOrigin {
    /// Taken as-is from the material library.
    Reference { library_name: String },
    /// Built from an element list.
    Compound { elements: Vec<ElementComponent> },
}

/// A resolved material.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Density in g/cm3.
    pub density: f64,
    pub state: MaterialState,
    /// Temperature in kelvin.
    pub temperature: f64,
    pub origin: MaterialOrigin,
}

impl Material {
    /// Returns `true` if the material was built from an element list.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        matches!(self.origin, MaterialOrigin::Compound { .. })
    }
}

/// Whether a material definition refers to the library or is built from elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    Reference,
    Compound,
}

/// Declarative definition of a material, before resolution.
///
/// Densities are in g/cm3 and temperatures in kelvin. Whether the optional
/// fields are present is checked when the material is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDef {
    pub name: String,
    pub kind: MaterialKind,
    /// Library entry name for reference materials; defaults to `name`.
    pub library_name: Option<String>,
    pub density: Option<f64>,
    pub state: Option<MaterialState>,
    pub temperature: Option<f64>,
    /// Element symbol and atom count, in declaration order.
    pub composition: Vec<(String, u32)>,
}

impl MaterialDef {
    /// Creates a definition referring to a library material of the same name.
    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MaterialKind::Reference,
            library_name: None,
            density: None,
            state: None,
            temperature: None,
            composition: Vec::new(),
        }
    }

    /// Creates a compound definition from its full set of properties.
    #[must_use]
    pub fn compound(
        name: impl Into<String>,
        density: f64,
        state: MaterialState,
        temperature: f64,
        composition: Vec<(String, u32)>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: MaterialKind::Compound,
            library_name: None,
            density: Some(density),
            state: Some(state),
            temperature: Some(temperature),
            composition,
        }
    }

    /// Converts a material record of a document into a definition.
    ///
    /// Units are normalised here; missing properties are left for the registry
    /// to reject.
    ///
    /// # Errors
    ///
    /// Returns an error if a unit or state string is not recognised.
    pub fn from_record(name: &str, record: &MaterialRecord) -> Result<Self, InputError> {
        let kind = match record.kind {
            MaterialKindRecord::Reference => MaterialKind::Reference,
            MaterialKindRecord::Compound => MaterialKind::Compound,
        };

        let density_unit = record
            .density_unit
            .as_deref()
            .map(DensityUnit::from_str)
            .transpose()?
            .unwrap_or_default();
        let temperature_unit = record
            .temperature_unit
            .as_deref()
            .map(TemperatureUnit::from_str)
            .transpose()?
            .unwrap_or_default();
        let state = record
            .state
            .as_deref()
            .map(MaterialState::from_str)
            .transpose()
            .map_err(|_| InputError::InvalidValue {
                record: name.to_owned(),
                field: "state".into(),
                reason: format!("unknown state `{}`", record.state.as_deref().unwrap_or("")),
            })?;

        Ok(Self {
            name: name.to_owned(),
            kind,
            library_name: record.name.clone(),
            density: record.density.map(|d| d * density_unit.to_g_per_cm3()),
            state,
            temperature: record.temperature.map(|t| temperature_unit.to_kelvin(t)),
            composition: record
                .composition
                .iter()
                .map(|(symbol, &count)| (symbol.clone(), count))
                .collect(),
        })
    }
}
