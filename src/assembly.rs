//! Rigid groups of volumes that can be imprinted several times.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, VolumeError};
use crate::math::{compose, Isometry3};
use crate::placement::{PhysicalVolume, PlacementDef, PlacementId};
use crate::report::{BuildWarning, Warnings};
use crate::store::GeometryStore;
use crate::volume::{VolumeBuilder, VolumeDef, VolumeId};

slotmap::new_key_type! {
    /// Unique identifier for an assembly in the geometry store.
    pub struct AssemblyId;
}

/// A built assembly: component volumes at fixed transforms relative to the
/// assembly frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub name: String,
    pub components: Vec<AssemblyComponent>,
    /// Number of times the assembly has been imprinted so far.
    pub imprint_count: u32,
}

/// One component of a built assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyComponent {
    pub volume: VolumeId,
    pub transform: Isometry3,
}

/// Where a component's volume comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentSource {
    /// A volume declared elsewhere in the document.
    Named(String),
    /// A volume declared inside the assembly.
    Inline(VolumeDef),
    /// Another assembly. Not supported; skipped with a warning.
    NestedAssembly(String),
}

/// Declarative description of one assembly component.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyComponentDef {
    pub source: ComponentSource,
    pub transform: Isometry3,
}

/// Declarative description of an assembly and where it is imprinted.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyDef {
    pub name: String,
    pub components: Vec<AssemblyComponentDef>,
    /// Each imprint's `volume` is the assembly name.
    pub imprints: Vec<PlacementDef>,
}

impl AssemblyDef {
    /// Returns the inline component volumes.
    pub fn inline_volumes(&self) -> impl Iterator<Item = &VolumeDef> {
        self.components.iter().filter_map(|c| match &c.source {
            ComponentSource::Inline(def) => Some(def),
            _ => None,
        })
    }

    /// Returns `true` if the assembly uses the named volume as a component.
    #[must_use]
    pub fn uses_volume(&self, name: &str) -> bool {
        self.components.iter().any(|c| match &c.source {
            ComponentSource::Named(n) => n == name,
            ComponentSource::Inline(def) => def.name == name,
            ComponentSource::NestedAssembly(_) => false,
        })
    }
}

/// Builds assemblies, memoized by name, and imprints them.
#[derive(Debug, Default)]
pub struct AssemblyBuilder {
    built: HashMap<String, AssemblyId>,
}

impl AssemblyBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of an already built assembly.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<AssemblyId> {
        self.built.get(name).copied()
    }

    /// Builds an assembly, creating inline component volumes on first use.
    ///
    /// Named components must already be built by `volumes`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::UnknownComponentVolume`] for a named component
    /// that is not a built volume, or any error from building an inline volume.
    pub fn build(
        &mut self,
        store: &mut GeometryStore,
        def: &AssemblyDef,
        volumes: &mut VolumeBuilder<'_>,
        warnings: &mut Warnings,
    ) -> Result<AssemblyId> {
        if let Some(id) = self.get(&def.name) {
            return Ok(id);
        }

        let mut components = Vec::with_capacity(def.components.len());
        for component in &def.components {
            let volume = match &component.source {
                ComponentSource::Named(name) => {
                    volumes
                        .get(name)
                        .ok_or_else(|| VolumeError::UnknownComponentVolume {
                            assembly: def.name.clone(),
                            volume: name.clone(),
                        })?
                }
                ComponentSource::Inline(volume) => volumes.build(store, volume, warnings)?,
                ComponentSource::NestedAssembly(name) => {
                    warnings.push(BuildWarning::NestedAssembly {
                        assembly: def.name.clone(),
                        component: name.clone(),
                    });
                    continue;
                }
            };
            components.push(AssemblyComponent {
                volume,
                transform: component.transform,
            });
        }

        debug!(assembly = %def.name, components = components.len(), "built assembly");
        let id = store.add_assembly(Assembly {
            name: def.name.clone(),
            components,
            imprint_count: 0,
        });
        self.built.insert(def.name.clone(), id);
        Ok(id)
    }
}

/// Places every component of an assembly under `parent`.
///
/// Each component lands at `transform ∘ component.transform`, with copy
/// number `copy_index`. Placements are named
/// `{assembly}_impr{n}_{volume}_{j}` for the `n`-th imprint and `j`-th
/// component, so repeated imprints never share a name.
///
/// # Errors
///
/// Returns an error if the assembly or a component volume is not in the store.
pub fn imprint(
    store: &mut GeometryStore,
    assembly: AssemblyId,
    transform: &Isometry3,
    parent: VolumeId,
    copy_index: u32,
) -> Result<Vec<PlacementId>> {
    let entry = store.assembly_mut(assembly)?;
    entry.imprint_count += 1;
    let imprint_number = entry.imprint_count;
    let assembly_name = entry.name.clone();
    let components = entry.components.clone();

    let mut placed = Vec::with_capacity(components.len());
    for (j, component) in components.iter().enumerate() {
        let volume_name = store.volume(component.volume)?.name.clone();
        let id = store.add_placement(PhysicalVolume {
            name: format!("{assembly_name}_impr{imprint_number}_{volume_name}_{j}"),
            volume: component.volume,
            mother: Some(parent),
            transform: compose(transform, &component.transform),
            copy_number: copy_index,
            assembly: Some(assembly),
        })?;
        placed.push(id);
    }
    debug!(
        assembly = %assembly_name,
        imprint = imprint_number,
        placements = placed.len(),
        "imprinted assembly"
    );
    Ok(placed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::DetgeomError;
    use crate::material::{MaterialRegistry, NistLibrary};
    use crate::math::{placement, Rotation3, Vector3};
    use crate::shape::{Orb, Primitive, ShapeDef};

    fn orb_volume(name: &str) -> VolumeDef {
        VolumeDef {
            name: name.into(),
            shape: ShapeDef::Primitive(Primitive::Orb(Orb { radius: 1.0 })),
            material: "G4_Pb".into(),
            is_active: false,
            hits_collection: None,
            visible: true,
        }
    }

    fn at(x: f64) -> Isometry3 {
        placement(Vector3::new(x, 0.0, 0.0), Rotation3::identity())
    }

    fn assembly(components: Vec<AssemblyComponentDef>) -> AssemblyDef {
        AssemblyDef {
            name: "Stack".into(),
            components,
            imprints: Vec::new(),
        }
    }

    #[test]
    fn imprint_composes_transforms() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut volumes = VolumeBuilder::new(MaterialRegistry::new(&lib, []));
        let mother = volumes.build(&mut store, &orb_volume("Mother"), &mut warnings).unwrap();
        volumes.build(&mut store, &orb_volume("Brick"), &mut warnings).unwrap();

        let def = assembly(vec![
            AssemblyComponentDef {
                source: ComponentSource::Named("Brick".into()),
                transform: at(1.0),
            },
            AssemblyComponentDef {
                source: ComponentSource::Inline(orb_volume("Cap")),
                transform: at(-1.0),
            },
        ]);
        let mut builder = AssemblyBuilder::new();
        let id = builder.build(&mut store, &def, &mut volumes, &mut warnings).unwrap();

        let first = imprint(&mut store, id, &at(10.0), mother, 0).unwrap();
        let second = imprint(&mut store, id, &at(20.0), mother, 1).unwrap();

        let brick = store.placement(first[0]).unwrap();
        assert_eq!(brick.name, "Stack_impr1_Brick_0");
        assert_relative_eq!(brick.transform.translation.vector, Vector3::new(11.0, 0.0, 0.0));
        let cap = store.placement(second[1]).unwrap();
        assert_eq!(cap.name, "Stack_impr2_Cap_1");
        assert_eq!(cap.copy_number, 1);
        assert_relative_eq!(cap.transform.translation.vector, Vector3::new(19.0, 0.0, 0.0));
        assert_eq!(store.volume(mother).unwrap().daughters.len(), 4);
        assert_eq!(store.assembly(id).unwrap().imprint_count, 2);
    }

    #[test]
    fn nested_assembly_is_skipped_with_warning() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut volumes = VolumeBuilder::new(MaterialRegistry::new(&lib, []));

        let def = assembly(vec![
            AssemblyComponentDef {
                source: ComponentSource::NestedAssembly("Inner".into()),
                transform: Isometry3::identity(),
            },
            AssemblyComponentDef {
                source: ComponentSource::Inline(orb_volume("Cap")),
                transform: Isometry3::identity(),
            },
        ]);
        let id = AssemblyBuilder::new()
            .build(&mut store, &def, &mut volumes, &mut warnings)
            .unwrap();

        assert_eq!(store.assembly(id).unwrap().components.len(), 1);
        assert_eq!(
            warnings.as_slice(),
            &[BuildWarning::NestedAssembly {
                assembly: "Stack".into(),
                component: "Inner".into(),
            }]
        );
    }

    #[test]
    fn unknown_named_component_is_fatal() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let mut warnings = Warnings::new();
        let mut volumes = VolumeBuilder::new(MaterialRegistry::new(&lib, []));

        let def = assembly(vec![AssemblyComponentDef {
            source: ComponentSource::Named("Ghost".into()),
            transform: Isometry3::identity(),
        }]);
        let err = AssemblyBuilder::new()
            .build(&mut store, &def, &mut volumes, &mut warnings)
            .unwrap_err();
        assert!(matches!(
            err,
            DetgeomError::Volume(VolumeError::UnknownComponentVolume { ref volume, .. }) if volume == "Ghost"
        ));
    }
}
