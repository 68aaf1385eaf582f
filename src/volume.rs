use std::collections::HashMap;

use tracing::debug;

use crate::document::RecordView;
use crate::error::{InputError, Result};
use crate::material::{MaterialId, MaterialRegistry};
use crate::placement::PlacementId;
use crate::report::Warnings;
use crate::shape::{RecordRole, ShapeBuilder, ShapeDef, ShapeId};
use crate::store::GeometryStore;

slotmap::new_key_type! {
    /// Unique identifier for a logical volume in the geometry store.
    pub struct VolumeId;
}

/// A shape paired with a material. Has no position of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalVolume {
    pub name: String,
    pub shape: ShapeId,
    pub material: MaterialId,
    /// Placements whose mother is this volume.
    pub daughters: Vec<PlacementId>,
    /// Hits collection this volume reports to, if it is sensitive.
    pub sensitive: Option<String>,
    pub visible: bool,
}

/// Declarative description of a logical volume.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeDef {
    pub name: String,
    pub shape: ShapeDef,
    pub material: String,
    pub is_active: bool,
    pub hits_collection: Option<String>,
    pub visible: bool,
}

impl VolumeDef {
    /// Reads a volume from a record whose name is already known.
    ///
    /// # Errors
    ///
    /// Returns an error if `material` is missing or the shape part is invalid.
    pub fn from_record(name: &str, view: &RecordView<'_>) -> Result<Self> {
        let material = view.str("material")?.ok_or_else(|| InputError::MissingField {
            record: name.to_owned(),
            field: "material",
        })?;
        let is_active = match view.bool("isActive")? {
            Some(active) => active,
            None => view.bool("is_active")?.unwrap_or(false),
        };
        let hits_collection = match view.str("hitsCollectionName")? {
            Some(collection) => Some(collection),
            None => view.str("hits_collection")?,
        };

        Ok(Self {
            name: name.to_owned(),
            shape: ShapeDef::from_record(view, RecordRole::Volume)?,
            material: material.to_owned(),
            is_active,
            hits_collection: hits_collection.map(str::to_owned),
            visible: view.bool("visible")?.unwrap_or(true),
        })
    }
}

/// Builds logical volumes, memoized by name.
///
/// Owns the material registry and shape builder of one build, so a volume's
/// material and shape are created on first use.
pub struct VolumeBuilder<'lib> {
    materials: MaterialRegistry<'lib>,
    shapes: ShapeBuilder,
    built: HashMap<String, VolumeId>,
}

impl<'lib> VolumeBuilder<'lib> {
    /// Creates a builder around a material registry.
    #[must_use]
    pub fn new(materials: MaterialRegistry<'lib>) -> Self {
        Self {
            materials,
            shapes: ShapeBuilder::new(),
            built: HashMap::new(),
        }
    }

    /// Returns the id of an already built volume.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<VolumeId> {
        self.built.get(name).copied()
    }

    /// Returns the names of every built volume.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.built.keys().map(String::as_str)
    }

    /// Builds a logical volume, or returns the one already built under its name.
    ///
    /// The material is resolved first, then the shape is built under the
    /// volume's name.
    ///
    /// # Errors
    ///
    /// Returns an error if the material cannot be resolved or the shape cannot
    /// be built.
    pub fn build(
        &mut self,
        store: &mut GeometryStore,
        def: &VolumeDef,
        warnings: &mut Warnings,
    ) -> Result<VolumeId> {
        if let Some(id) = self.get(&def.name) {
            debug!(volume = %def.name, "volume cache hit");
            return Ok(id);
        }

        let material = self.materials.resolve(store, &def.material)?;
        let shape = self.shapes.build(store, &def.shape, &def.name, warnings)?;
        let id = store.add_volume(LogicalVolume {
            name: def.name.clone(),
            shape,
            material,
            daughters: Vec::new(),
            sensitive: None,
            visible: def.visible,
        });
        debug!(volume = %def.name, material = %def.material, "built logical volume");
        self.built.insert(def.name.clone(), id);
        Ok(id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::{DetgeomError, MaterialError};
    use crate::material::NistLibrary;
    use crate::math::{AngleUnit, LengthUnit};

    fn def(value: &serde_json::Value) -> VolumeDef {
        let fields = value.as_object().unwrap();
        let view = RecordView::new("v", fields, LengthUnit::Millimeter, AngleUnit::Degree).unwrap();
        VolumeDef::from_record(fields["name"].as_str().unwrap(), &view).unwrap()
    }

    #[test]
    fn record_flags_are_read() {
        let v = def(&json!({ "name": "Det", "type": "orb", "radius": 5, "material": "G4_WATER",
                             "isActive": true, "hitsCollectionName": "Hits", "visible": false }));
        assert!(v.is_active);
        assert_eq!(v.hits_collection.as_deref(), Some("Hits"));
        assert!(!v.visible);
    }

    #[test]
    fn missing_material_is_reported() {
        let value = json!({ "name": "Det", "type": "orb", "radius": 5 });
        let fields = value.as_object().unwrap();
        let view = RecordView::new("Det", fields, LengthUnit::Millimeter, AngleUnit::Degree).unwrap();
        let err = VolumeDef::from_record("Det", &view).unwrap_err();
        assert!(matches!(
            err,
            DetgeomError::Input(InputError::MissingField { field: "material", .. })
        ));
    }

    #[test]
    fn volumes_are_memoized_and_share_materials() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = VolumeBuilder::new(MaterialRegistry::new(&lib, []));

        let a = def(&json!({ "name": "A", "type": "orb", "radius": 5, "material": "G4_AIR" }));
        let b = def(&json!({ "name": "B", "type": "orb", "radius": 2, "material": "G4_AIR" }));
        let first = builder.build(&mut store, &a, &mut warnings).unwrap();
        let again = builder.build(&mut store, &a, &mut warnings).unwrap();
        let other = builder.build(&mut store, &b, &mut warnings).unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(store.material_count(), 1);
        assert_eq!(store.shape_count(), 2);
        assert_eq!(
            store.volume(first).unwrap().material,
            store.volume(other).unwrap().material
        );
    }

    #[test]
    fn unknown_material_aborts_before_shape() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut builder = VolumeBuilder::new(MaterialRegistry::new(&lib, []));

        let v = def(&json!({ "name": "A", "type": "orb", "radius": 5, "material": "Kryptonite" }));
        let err = builder.build(&mut store, &v, &mut warnings).unwrap_err();
        assert!(matches!(err, DetgeomError::Material(MaterialError::UnknownReferenceMaterial(_))));
        assert_eq!(store.shape_count(), 0);
        assert!(builder.get("A").is_none());
    }
}
