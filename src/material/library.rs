use super::{Element, Material, MaterialOrigin, MaterialState};

/// External lookup service for reference materials and elements.
///
/// The geometry builder never owns a material database; it asks a library by
/// exact name. Implementations must be pure lookups: the registry caches the
/// results and relies on repeated calls returning equal values.
pub trait MaterialLibrary {
    /// Looks up a reference material by its exact library name.
    fn find_material(&self, name: &str) -> Option<Material>;

    /// Looks up an element by its chemical symbol.
    fn find_element(&self, symbol: &str) -> Option<Element>;
}

/// Room temperature used for library materials, in kelvin.
const NTP_TEMPERATURE: f64 = 293.15;

/// Element table: symbol, atomic number, molar mass (g/mol).
const ELEMENTS: &[(&str, u32, f64)] = &[
    ("H", 1, 1.008),
    ("He", 2, 4.0026),
    ("Li", 3, 6.94),
    ("Be", 4, 9.0122),
    ("B", 5, 10.81),
    ("C", 6, 12.011),
    ("N", 7, 14.007),
    ("O", 8, 15.999),
    ("F", 9, 18.998),
    ("Ne", 10, 20.180),
    ("Na", 11, 22.990),
    ("Mg", 12, 24.305),
    ("Al", 13, 26.982),
    ("Si", 14, 28.085),
    ("P", 15, 30.974),
    ("S", 16, 32.06),
    ("Cl", 17, 35.45),
    ("Ar", 18, 39.948),
    ("K", 19, 39.098),
    ("Ca", 20, 40.078),
    ("Ti", 22, 47.867),
    ("Cr", 24, 51.996),
    ("Mn", 25, 54.938),
    ("Fe", 26, 55.845),
    ("Co", 27, 58.933),
    ("Ni", 28, 58.693),
    ("Cu", 29, 63.546),
    ("Zn", 30, 65.38),
    ("Ge", 32, 72.630),
    ("Br", 35, 79.904),
    ("Kr", 36, 83.798),
    ("Ag", 47, 107.87),
    ("Sn", 50, 118.71),
    ("I", 53, 126.90),
    ("Xe", 54, 131.29),
    ("Cs", 55, 132.91),
    ("Gd", 64, 157.25),
    ("W", 74, 183.84),
    ("Pt", 78, 195.08),
    ("Au", 79, 196.97),
    ("Pb", 82, 207.2),
    ("Bi", 83, 208.98),
    ("U", 92, 238.03),
];

/// Reference materials: name, density (g/cm3), state, temperature (K).
const MATERIALS: &[(&str, f64, MaterialState, f64)] = &[
    ("G4_Galactic", 1e-25, MaterialState::Gas, 2.73),
    ("G4_AIR", 1.204_79e-3, MaterialState::Gas, NTP_TEMPERATURE),
    ("G4_WATER", 1.0, MaterialState::Liquid, NTP_TEMPERATURE),
    ("G4_H", 8.375_48e-5, MaterialState::Gas, NTP_TEMPERATURE),
    ("G4_He", 1.663_22e-4, MaterialState::Gas, NTP_TEMPERATURE),
    ("G4_N", 1.165_06e-3, MaterialState::Gas, NTP_TEMPERATURE),
    ("G4_O", 1.331_51e-3, MaterialState::Gas, NTP_TEMPERATURE),
    ("G4_Ar", 1.662_01e-3, MaterialState::Gas, NTP_TEMPERATURE),
    ("G4_Xe", 5.485_36e-3, MaterialState::Gas, NTP_TEMPERATURE),
    ("G4_lAr", 1.396, MaterialState::Liquid, NTP_TEMPERATURE),
    ("G4_lXe", 2.953, MaterialState::Liquid, NTP_TEMPERATURE),
    ("G4_Al", 2.699, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_Si", 2.33, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_Ti", 4.54, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_Fe", 7.874, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_Cu", 8.96, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_Ge", 5.323, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_W", 19.3, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_Pb", 11.35, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_Au", 19.32, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_STAINLESS-STEEL", 8.0, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_POLYETHYLENE", 0.94, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_TEFLON", 2.2, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_KAPTON", 1.42, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_MYLAR", 1.4, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_PLEXIGLASS", 1.19, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_GLASS_PLATE", 2.4, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_CONCRETE", 2.3, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_SODIUM_IODIDE", 3.667, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_CESIUM_IODIDE", 4.51, MaterialState::Solid, NTP_TEMPERATURE),
    ("G4_PLASTIC_SC_VINYLTOLUENE", 1.032, MaterialState::Solid, NTP_TEMPERATURE),
];

/// Built-in library with a subset of the NIST material and element tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct NistLibrary;

impl NistLibrary {
    /// Creates the built-in library.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MaterialLibrary for NistLibrary {
    fn find_material(&self, name: &str) -> Option<Material> {
        MATERIALS
            .iter()
            .find(|(entry, ..)| *entry == name)
            .map(|&(entry, density, state, temperature)| Material {
                name: entry.to_owned(),
                density,
                state,
                temperature,
                origin: MaterialOrigin::Reference {
                    library_name: entry.to_owned(),
                },
            })
    }

    fn find_element(&self, symbol: &str) -> Option<Element> {
        ELEMENTS
            .iter()
            .find(|(entry, ..)| *entry == symbol)
            .map(|&(entry, z, molar_mass)| Element {
                symbol: entry.to_owned(),
                z,
                molar_mass,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn finds_reference_material_by_exact_name() {
        let lib = NistLibrary::new();
        let water = lib.find_material("G4_WATER").unwrap();
        assert_eq!(water.state, MaterialState::Liquid);
        assert!(!water.is_compound());
        assert!(lib.find_material("g4_water").is_none());
    }

    #[test]
    fn finds_element_by_symbol() {
        let xe = NistLibrary::new().find_element("Xe").unwrap();
        assert_eq!(xe.z, 54);
        assert!(NistLibrary::new().find_element("Xx").is_none());
    }
}
