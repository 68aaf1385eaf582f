//! Build configuration and the top-level geometry build.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, info_span};

use crate::description::GeometryDescription;
use crate::document::{GeometryDocument, MaterialsDocument};
use crate::error::{InputError, Result, VolumeError};
use crate::material::MaterialLibrary;
use crate::math::{AngleUnit, LengthUnit};
use crate::placement::{PhysicalVolume, PlacementId, PlacementResolver};
use crate::report::BuildWarning;
use crate::sensitivity::{cross_check, HitsCollections, SensitivityTagger};
use crate::store::GeometryStore;
use crate::volume::{LogicalVolume, VolumeId};

/// Options of a geometry build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Unit of plain-number lengths in documents.
    pub default_length_unit: LengthUnit,
    /// Unit of plain-number angles in documents.
    pub default_angle_unit: AngleUnit,
    /// Collection of active volumes that name none.
    pub default_hits_collection: String,
    /// Name of the world when its record has none.
    pub world_name: String,
    /// Warn about placements that leave their mother's bounding box.
    pub check_extents: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            default_length_unit: LengthUnit::Millimeter,
            default_angle_unit: AngleUnit::Degree,
            default_hits_collection: "MyHitsCollection".into(),
            world_name: "World".into(),
            check_extents: false,
        }
    }
}

impl BuildOptions {
    /// Parses options from JSON; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid options object.
    pub fn from_json(text: &str) -> std::result::Result<Self, InputError> {
        serde_json::from_str(text).map_err(|source| InputError::Json {
            origin: "build options".into(),
            source,
        })
    }
}

/// A finished geometry: the store that owns it, its root and its metadata.
#[derive(Debug)]
pub struct BuiltGeometry {
    pub store: GeometryStore,
    /// The world placement.
    pub world: PlacementId,
    pub hits_collections: HitsCollections,
    pub warnings: Vec<BuildWarning>,
}

impl BuiltGeometry {
    /// Returns the world placement.
    ///
    /// # Errors
    ///
    /// Returns an error if the world is not in the store.
    pub fn world(&self) -> Result<&PhysicalVolume> {
        Ok(self.store.placement(self.world)?)
    }

    /// Finds a logical volume by name.
    #[must_use]
    pub fn find_volume(&self, name: &str) -> Option<(VolumeId, &LogicalVolume)> {
        self.store.volumes().find(|(_, volume)| volume.name == name)
    }

    /// Returns the placements directly inside the named volume.
    ///
    /// # Errors
    ///
    /// Returns an error if no volume has that name.
    pub fn daughters(&self, name: &str) -> Result<Vec<&PhysicalVolume>> {
        let (_, volume) = self
            .find_volume(name)
            .ok_or_else(|| VolumeError::UnknownVolume(name.to_owned()))?;
        volume
            .daughters
            .iter()
            .map(|id| self.store.placement(*id).map_err(Into::into))
            .collect()
    }
}

/// Runs the whole pipeline on a description: volumes, placements, then
/// sensitivity tagging.
///
/// # Errors
///
/// Returns the first fatal error of the build. Non-fatal conditions are in
/// [`BuiltGeometry::warnings`].
pub fn build_geometry(
    description: &GeometryDescription,
    library: &dyn MaterialLibrary,
    options: &BuildOptions,
) -> Result<BuiltGeometry> {
    let resolution = PlacementResolver::for_description(library, description)
        .with_extent_check(options.check_extents)
        .resolve_all(description)?;
    let mut store = resolution.store;
    let mut warnings = resolution.warnings;

    let tagger = SensitivityTagger::new(options.default_hits_collection.clone());
    let hits_collections = tagger.tag_all(description.all_volumes());
    tagger.attach(&mut store, &hits_collections);
    cross_check(&description.hits_collections, &hits_collections, &mut warnings);

    info!(
        materials = store.material_count(),
        shapes = store.shape_count(),
        placements = store.placement_count(),
        warnings = warnings.as_slice().len(),
        "geometry built"
    );
    Ok(BuiltGeometry {
        store,
        world: resolution.world,
        hits_collections,
        warnings: warnings.into_vec(),
    })
}

/// Builds the geometry described by a file on disk.
#[derive(Debug, Clone)]
pub struct Detector {
    geometry_file: PathBuf,
    materials_file: Option<PathBuf>,
    options: BuildOptions,
}

impl Detector {
    /// Creates a detector for a geometry file, with default options.
    #[must_use]
    pub fn new(geometry_file: impl Into<PathBuf>) -> Self {
        Self {
            geometry_file: geometry_file.into(),
            materials_file: None,
            options: BuildOptions::default(),
        }
    }

    /// Uses a separate materials file.
    #[must_use]
    pub fn with_materials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.materials_file = Some(path.into());
        self
    }

    /// Replaces the build options.
    #[must_use]
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Changes the geometry file used by the next build.
    pub fn set_geometry_file(&mut self, path: impl Into<PathBuf>) {
        self.geometry_file = path.into();
    }

    /// Changes the materials file used by the next build.
    pub fn set_materials_file(&mut self, path: Option<PathBuf>) {
        self.materials_file = path;
    }

    #[must_use]
    pub fn geometry_file(&self) -> &Path {
        &self.geometry_file
    }

    #[must_use]
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Reads the files and builds the geometry from scratch.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or parsed, or the build fails.
    pub fn construct(&self, library: &dyn MaterialLibrary) -> Result<BuiltGeometry> {
        let span = info_span!("construct", geometry = %self.geometry_file.display());
        let _guard = span.enter();

        let document = GeometryDocument::load(&self.geometry_file)?;
        let materials = self
            .materials_file
            .as_deref()
            .map(MaterialsDocument::load)
            .transpose()?;
        let description = GeometryDescription::from_document(
            &document,
            materials.as_ref(),
            &self.options,
            self.geometry_file.parent(),
        )?;
        build_geometry(&description, library, &self.options)
    }

    /// Discards a previous geometry and builds a fresh one.
    ///
    /// Nothing of `previous` is reused; every id into it becomes invalid.
    ///
    /// # Errors
    ///
    /// See [`Detector::construct`].
    pub fn rebuild(
        &self,
        library: &dyn MaterialLibrary,
        previous: BuiltGeometry,
    ) -> Result<BuiltGeometry> {
        info!(placements = previous.store.placement_count(), "discarding geometry");
        drop(previous);
        self.construct(library)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn options_default_and_parse() {
        let defaults = BuildOptions::default();
        assert_eq!(defaults.default_hits_collection, "MyHitsCollection");
        assert_eq!(defaults.world_name, "World");

        let parsed =
            BuildOptions::from_json(r#"{ "default_length_unit": "cm", "check_extents": true }"#)
                .unwrap();
        assert_eq!(parsed.default_length_unit, LengthUnit::Centimeter);
        assert!(parsed.check_extents);
        assert_eq!(parsed.default_angle_unit, AngleUnit::Degree);
    }

    #[test]
    fn unknown_unit_in_options_is_rejected() {
        assert!(BuildOptions::from_json(r#"{ "default_angle_unit": "gon" }"#).is_err());
    }

    #[test]
    fn missing_geometry_file_is_an_io_error() {
        let detector = Detector::new("/nonexistent/geometry.json");
        let err = detector.construct(&crate::material::NistLibrary::new()).unwrap_err();
        assert!(matches!(err, crate::error::DetgeomError::Input(InputError::Io { .. })));
    }
}
