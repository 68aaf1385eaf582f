use std::collections::HashMap;

use tracing::debug;

use crate::error::{MaterialError, Result};
use crate::store::GeometryStore;

use super::{
    ElementComponent, Material, MaterialDef, MaterialId, MaterialKind, MaterialLibrary,
    MaterialOrigin,
};

/// Resolves material names to materials owned by a [`GeometryStore`].
///
/// Each name is resolved at most once per registry; later calls return the
/// cached id without consulting the library again. A name without a
/// definition is looked up in the library as a reference material.
pub struct MaterialRegistry<'lib> {
    library: &'lib dyn MaterialLibrary,
    defs: HashMap<String, MaterialDef>,
    resolved: HashMap<String, MaterialId>,
}

impl<'lib> MaterialRegistry<'lib> {
    /// Creates a registry over the given library and material definitions.
    pub fn new(
        library: &'lib dyn MaterialLibrary,
        defs: impl IntoIterator<Item = MaterialDef>,
    ) -> Self {
        Self {
            library,
            defs: defs.into_iter().map(|def| (def.name.clone(), def)).collect(),
            resolved: HashMap::new(),
        }
    }

    /// Returns the id of an already resolved material.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<MaterialId> {
        self.resolved.get(name).copied()
    }

    /// Resolves a material by name, creating it in the store on first use.
    ///
    /// # Errors
    ///
    /// Returns [`MaterialError::UnknownReferenceMaterial`] if a reference
    /// material is not in the library, and [`MaterialError::InvalidMaterialSpec`]
    /// if a compound lacks density, state, temperature or composition, or
    /// names an element the library does not know.
    pub fn resolve(&mut self, store: &mut GeometryStore, name: &str) -> Result<MaterialId> {
        if let Some(&id) = self.resolved.get(name) {
            debug!(material = name, "material cache hit");
            return Ok(id);
        }

        let material = match self.defs.get(name) {
            Some(def) => match def.kind {
                MaterialKind::Reference => {
                    let library_name = def.library_name.as_deref().unwrap_or(name);
                    self.lookup_reference(name, library_name)?
                }
                MaterialKind::Compound => self.build_compound(def)?,
            },
            None => self.lookup_reference(name, name)?,
        };

        debug!(
            material = name,
            compound = material.is_compound(),
            density = material.density,
            "created material"
        );
        let id = store.add_material(material);
        self.resolved.insert(name.to_owned(), id);
        Ok(id)
    }

    fn lookup_reference(&self, name: &str, library_name: &str) -> Result<Material> {
        let mut material = self
            .library
            .find_material(library_name)
            .ok_or_else(|| MaterialError::UnknownReferenceMaterial(library_name.to_owned()))?;
        material.name = name.to_owned();
        Ok(material)
    }

    fn build_compound(&self, def: &MaterialDef) -> Result<Material> {
        let invalid = |reason: &str| MaterialError::InvalidMaterialSpec {
            material: def.name.clone(),
            reason: reason.to_owned(),
        };

        let density = def.density.ok_or_else(|| invalid("missing density"))?;
        let state = def.state.ok_or_else(|| invalid("missing state"))?;
        let temperature = def.temperature.ok_or_else(|| invalid("missing temperature"))?;
        if def.composition.is_empty() {
            return Err(invalid("empty composition").into());
        }
        if density <= 0.0 {
            return Err(invalid("density must be positive").into());
        }

        let mut elements = Vec::with_capacity(def.composition.len());
        for (symbol, atoms) in &def.composition {
            if *atoms == 0 {
                return Err(invalid(&format!("element `{symbol}` has zero atoms")).into());
            }
            let element = self
                .library
                .find_element(symbol)
                .ok_or_else(|| invalid(&format!("unknown element `{symbol}`")))?;
            elements.push(ElementComponent {
                element,
                atoms: *atoms,
                mass_fraction: 0.0,
            });
        }

        let total_mass: f64 = elements
            .iter()
            .map(|c| f64::from(c.atoms) * c.element.molar_mass)
            .sum();
        for component in &mut elements {
            component.mass_fraction =
                f64::from(component.atoms) * component.element.molar_mass / total_mass;
        }

        Ok(Material {
            name: def.name.clone(),
            density,
            state,
            temperature,
            origin: MaterialOrigin::Compound { elements },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::error::DetgeomError;
    use crate::material::{Element, MaterialState, NistLibrary};

    /// Wraps the built-in library and counts lookups.
    #[derive(Default)]
    struct CountingLibrary {
        inner: NistLibrary,
        material_lookups: Cell<usize>,
        element_lookups: Cell<usize>,
    }

    impl MaterialLibrary for CountingLibrary {
        fn find_material(&self, name: &str) -> Option<Material> {
            self.material_lookups.set(self.material_lookups.get() + 1);
            self.inner.find_material(name)
        }

        fn find_element(&self, symbol: &str) -> Option<Element> {
            self.element_lookups.set(self.element_lookups.get() + 1);
            self.inner.find_element(symbol)
        }
    }

    fn liquid_xenon() -> MaterialDef {
        MaterialDef::compound("LXe", 2.953, MaterialState::Liquid, 165.0, vec![("Xe".into(), 1)])
    }

    #[test]
    fn reference_resolution_is_idempotent() {
        let lib = CountingLibrary::default();
        let mut store = GeometryStore::new();
        let mut registry = MaterialRegistry::new(&lib, []);

        let first = registry.resolve(&mut store, "G4_AIR").unwrap();
        let second = registry.resolve(&mut store, "G4_AIR").unwrap();

        assert_eq!(first, second);
        assert_eq!(lib.material_lookups.get(), 1);
        assert_eq!(store.material_count(), 1);
    }

    #[test]
    fn compound_resolution_is_idempotent() {
        let lib = CountingLibrary::default();
        let mut store = GeometryStore::new();
        let mut registry = MaterialRegistry::new(&lib, [liquid_xenon()]);

        let first = registry.resolve(&mut store, "LXe").unwrap();
        let second = registry.resolve(&mut store, "LXe").unwrap();

        assert_eq!(first, second);
        assert_eq!(lib.element_lookups.get(), 1);
        assert!(store.material(first).unwrap().is_compound());
    }

    #[test]
    fn unknown_reference_material_is_fatal() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let mut registry = MaterialRegistry::new(&lib, []);

        let err = registry.resolve(&mut store, "Unobtainium").unwrap_err();
        assert!(matches!(
            err,
            DetgeomError::Material(MaterialError::UnknownReferenceMaterial(ref n)) if n == "Unobtainium"
        ));
    }

    #[test]
    fn reference_definition_may_rename_library_entry() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let mut def = MaterialDef::reference("Air");
        def.library_name = Some("G4_AIR".into());
        let mut registry = MaterialRegistry::new(&lib, [def]);

        let id = registry.resolve(&mut store, "Air").unwrap();
        let air = store.material(id).unwrap();
        assert_eq!(air.name, "Air");
        assert!(matches!(
            air.origin,
            MaterialOrigin::Reference { ref library_name } if library_name == "G4_AIR"
        ));
    }

    #[test]
    fn compound_without_composition_is_invalid() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let def = MaterialDef::compound("Empty", 1.0, MaterialState::Solid, 293.0, vec![]);
        let mut registry = MaterialRegistry::new(&lib, [def]);

        let err = registry.resolve(&mut store, "Empty").unwrap_err();
        assert!(matches!(
            err,
            DetgeomError::Material(MaterialError::InvalidMaterialSpec { .. })
        ));
    }

    #[test]
    fn compound_missing_density_is_invalid() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let mut def = liquid_xenon();
        def.density = None;
        let mut registry = MaterialRegistry::new(&lib, [def]);

        let err = registry.resolve(&mut store, "LXe").unwrap_err();
        assert!(err.to_string().contains("missing density"), "{err}");
    }

    #[test]
    fn compound_with_unknown_element_is_invalid() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let def = MaterialDef::compound(
            "Odd",
            1.0,
            MaterialState::Solid,
            293.0,
            vec![("Qq".into(), 2)],
        );
        let mut registry = MaterialRegistry::new(&lib, [def]);

        let err = registry.resolve(&mut store, "Odd").unwrap_err();
        assert!(err.to_string().contains("unknown element `Qq`"), "{err}");
    }

    #[test]
    fn water_mass_fractions_follow_molar_masses() {
        let lib = NistLibrary::new();
        let mut store = GeometryStore::new();
        let def = MaterialDef::compound(
            "Water",
            1.0,
            MaterialState::Liquid,
            293.15,
            vec![("H".into(), 2), ("O".into(), 1)],
        );
        let mut registry = MaterialRegistry::new(&lib, [def]);

        let id = registry.resolve(&mut store, "Water").unwrap();
        let MaterialOrigin::Compound { elements } = &store.material(id).unwrap().origin else {
            panic!("expected compound");
        };
        let hydrogen = elements.iter().find(|c| c.element.symbol == "H").unwrap();
        assert!((hydrogen.mass_fraction - 0.1119).abs() < 1e-3);
        let total: f64 = elements.iter().map(|c| c.mass_fraction).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
