//! Conversion of parsed documents into a typed geometry description.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::{debug, info};

use crate::assembly::{AssemblyComponentDef, AssemblyDef, ComponentSource};
use crate::detector::BuildOptions;
use crate::document::{
    ExternalDocument, GeometryDocument, HitsCollectionRecord, MaterialsDocument, RecordView,
    VolumeRecord,
};
use crate::error::{InputError, Result};
use crate::material::MaterialDef;
use crate::math::{placement, Rotation3, Vector3};
use crate::placement::PlacementDef;
use crate::volume::VolumeDef;

/// Everything a geometry build needs, in canonical units.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryDescription {
    pub world: VolumeDef,
    /// Volume definitions in document order, imported volumes included.
    pub volumes: Vec<VolumeDef>,
    pub assemblies: Vec<AssemblyDef>,
    pub placements: Vec<PlacementDef>,
    pub materials: Vec<MaterialDef>,
    /// Informational hits-collection declarations.
    pub hits_collections: Vec<HitsCollectionRecord>,
}

impl GeometryDescription {
    /// Converts a geometry document, and optionally a separate materials
    /// document, into a description.
    ///
    /// Materials declared in the geometry document override same-named
    /// entries of the materials document. `base_dir` is where
    /// `external_file` paths are resolved from.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed records, missing required fields or
    /// dimensions, and unreadable external files.
    pub fn from_document(
        document: &GeometryDocument,
        materials: Option<&MaterialsDocument>,
        options: &BuildOptions,
        base_dir: Option<&Path>,
    ) -> Result<Self> {
        let mut reader = Reader {
            options,
            base_dir,
            assembly_names: assembly_names(&document.volumes),
            description: GeometryDescription {
                world: world(&document.world, options)?,
                volumes: Vec::new(),
                assemblies: Vec::new(),
                placements: Vec::new(),
                materials: material_defs(document, materials)?,
                hits_collections: document.hits_collections.clone(),
            },
        };

        let top = Naming::top_level(&reader.description.world.name);
        for (i, record) in document.volumes.iter().enumerate() {
            if record.fields.contains_key("external_file") {
                reader.import(record, i)?;
            } else {
                reader.record(record, i, &top)?;
            }
        }

        let description = reader.description;
        info!(
            volumes = description.volumes.len(),
            assemblies = description.assemblies.len(),
            placements = description.placements.len(),
            materials = description.materials.len(),
            "geometry description read"
        );
        Ok(description)
    }

    /// Returns every volume definition: the world, the listed volumes and
    /// inline assembly components.
    pub fn all_volumes(&self) -> impl Iterator<Item = &VolumeDef> {
        std::iter::once(&self.world)
            .chain(&self.volumes)
            .chain(self.assemblies.iter().flat_map(AssemblyDef::inline_volumes))
    }
}

struct Reader<'a> {
    options: &'a BuildOptions,
    base_dir: Option<&'a Path>,
    assembly_names: HashSet<String>,
    description: GeometryDescription,
}

/// How names in a record map to names in the description.
struct Naming {
    prefix: Option<String>,
    /// Parent used when a placement names none.
    default_parent: String,
}

impl Naming {
    fn top_level(world: &str) -> Self {
        Self {
            prefix: None,
            default_parent: world.to_owned(),
        }
    }

    fn name(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}_{name}"),
            None => name.to_owned(),
        }
    }

    fn parent(&self, parent: Option<&str>) -> String {
        parent.map_or_else(|| self.default_parent.clone(), |p| self.name(p))
    }
}

impl Reader<'_> {
    fn view<'r>(&self, label: &'r str, record: &'r VolumeRecord) -> Result<RecordView<'r>> {
        Ok(RecordView::new(
            label,
            &record.fields,
            self.options.default_length_unit,
            self.options.default_angle_unit,
        )?)
    }

    fn record(&mut self, record: &VolumeRecord, index: usize, naming: &Naming) -> Result<()> {
        let raw_name = record.name().ok_or_else(|| InputError::MissingField {
            record: format!("volumes[{index}]"),
            field: "name",
        })?;
        let name = naming.name(raw_name);
        let view = self.view(&name, record)?;

        if view.str("type")? == Some("assembly") {
            let assembly = self.assembly(&view, &name, naming)?;
            self.description.assemblies.push(assembly);
            return Ok(());
        }

        let mut def = VolumeDef::from_record(&name, &view)?;
        if naming.prefix.is_some() {
            def.shape.rename_references(&|reference| naming.name(reference));
        }
        if view.bool("root")? == Some(true) {
            // Placed by the importing record.
            debug!(volume = %name, "import root");
        } else {
            let placements = placements_of(&view, &name, naming)?;
            self.description.placements.extend(placements);
        }
        self.description.volumes.push(def);
        Ok(())
    }

    fn assembly(&self, view: &RecordView<'_>, name: &str, naming: &Naming) -> Result<AssemblyDef> {
        let items = view
            .get("components")
            .and_then(|value| value.as_array())
            .ok_or_else(|| view.invalid("components", "assemblies need a components array"))?;

        let mut components = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let label = format!("{name}.components[{i}]");
            let entry = view.nested(&label, item)?;
            let source = if let Some(inner) = entry.str("assembly")? {
                ComponentSource::NestedAssembly(naming.name(inner))
            } else if let Some(volume) = entry.str("volume")? {
                let volume = naming.name(volume);
                if self.assembly_names.contains(&volume) {
                    ComponentSource::NestedAssembly(volume)
                } else {
                    ComponentSource::Named(volume)
                }
            } else if entry.str("type")? == Some("assembly") {
                ComponentSource::NestedAssembly(naming.name(entry.str("name")?.unwrap_or(&label)))
            } else {
                let inline_name = entry.str("name")?.ok_or_else(|| InputError::MissingField {
                    record: label.clone(),
                    field: "name",
                })?;
                ComponentSource::Inline(VolumeDef::from_record(&naming.name(inline_name), &entry)?)
            };
            components.push(AssemblyComponentDef {
                source,
                transform: placement(
                    entry.vector("position")?.unwrap_or_else(Vector3::zeros),
                    entry.rotation("rotation")?.unwrap_or_else(Rotation3::identity),
                ),
            });
        }

        Ok(AssemblyDef {
            name: name.to_owned(),
            components,
            imprints: placements_of(view, name, naming)?,
        })
    }

    /// Reads an external geometry file and adds its volumes under a prefix.
    ///
    /// The volume marked `root: true` is placed where the importing record
    /// says; the others keep their own placements, with parent names prefixed.
    fn import(&mut self, record: &VolumeRecord, index: usize) -> Result<()> {
        let label = record.name().map_or_else(|| format!("volumes[{index}]"), str::to_owned);
        let view = self.view(&label, record)?;
        let file = view
            .str("external_file")?
            .ok_or_else(|| view.invalid("external_file", "expected a file name"))?;
        let path = match self.base_dir {
            Some(dir) => dir.join(file),
            None => Path::new(file).to_path_buf(),
        };
        let external = ExternalDocument::load(&path)?;

        let top = Naming::top_level(&self.description.world.name);
        let naming = Naming {
            prefix: view.str("name_prefix")?.map(str::to_owned),
            default_parent: top.parent(view.mother()?),
        };

        let mut root = None;
        for (i, ext_record) in external.volumes.iter().enumerate() {
            if ext_record.fields.contains_key("external_file") {
                return Err(InputError::InvalidValue {
                    record: format!("{}:volumes[{i}]", path.display()),
                    field: "external_file".into(),
                    reason: "imported files cannot import further files".into(),
                }
                .into());
            }
            if ext_record.fields.get("root").and_then(serde_json::Value::as_bool) == Some(true) {
                root = ext_record.name().map(|n| naming.name(n));
            }
            self.record(ext_record, i, &naming)?;
        }

        let root = root.ok_or_else(|| InputError::InvalidValue {
            record: label.clone(),
            field: "external_file".into(),
            reason: format!("{} has no volume marked `root: true`", path.display()),
        })?;
        info!(file = %path.display(), root = %root, "imported external geometry");
        let placements = placements_of(&view, &root, &top)?;
        self.description.placements.extend(placements);
        Ok(())
    }
}

fn world(record: &VolumeRecord, options: &BuildOptions) -> Result<VolumeDef> {
    let name = record.name().unwrap_or(&options.world_name);
    let view = RecordView::new(
        name,
        &record.fields,
        options.default_length_unit,
        options.default_angle_unit,
    )?;
    VolumeDef::from_record(name, &view)
}

fn assembly_names(records: &[VolumeRecord]) -> HashSet<String> {
    records
        .iter()
        .filter(|r| r.fields.get("type").and_then(serde_json::Value::as_str) == Some("assembly"))
        .filter_map(|r| r.name().map(str::to_owned))
        .collect()
}

fn material_defs(
    document: &GeometryDocument,
    materials: Option<&MaterialsDocument>,
) -> Result<Vec<MaterialDef>> {
    let mut defs = BTreeMap::new();
    let external = materials.map(|m| &m.materials).into_iter().flatten();
    for (name, record) in external.chain(&document.materials) {
        defs.insert(name.clone(), MaterialDef::from_record(name, record)?);
    }
    Ok(defs.into_values().collect())
}

/// Reads the placements of a record: a `placements` array of
/// `{x, y, z, unit?, rotation?, parent?}` entries, or inline `position`,
/// `rotation` and `mother_volume`.
fn placements_of(view: &RecordView<'_>, volume: &str, naming: &Naming) -> Result<Vec<PlacementDef>> {
    let Some(entries) = view.get("placements") else {
        let position = view.vector("position")?.unwrap_or_else(Vector3::zeros);
        return Ok(vec![placement_def(view, volume, position, naming)?]);
    };

    let items = entries
        .as_array()
        .ok_or_else(|| view.invalid("placements", "expected an array"))?;
    let mut defs = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let label = format!("{}.placements[{i}]", view.label());
        let entry = view.nested(&label, item)?;
        let position = match entry.vector("position")? {
            Some(position) => position,
            None => Vector3::new(
                entry.length("x")?.unwrap_or(0.0),
                entry.length("y")?.unwrap_or(0.0),
                entry.length("z")?.unwrap_or(0.0),
            ),
        };
        defs.push(placement_def(&entry, volume, position, naming)?);
    }
    Ok(defs)
}

fn placement_def(
    view: &RecordView<'_>,
    volume: &str,
    position: Vector3,
    naming: &Naming,
) -> Result<PlacementDef> {
    let copies = view.u32("copies")?.unwrap_or(1);
    if copies == 0 {
        return Err(view.invalid("copies", "must be at least 1").into());
    }
    Ok(PlacementDef {
        volume: volume.to_owned(),
        parent: naming.parent(view.mother()?),
        transform: placement(
            position,
            view.rotation("rotation")?.unwrap_or_else(Rotation3::identity),
        ),
        copies,
        copy_offset: view.vector("copy_offset")?.unwrap_or_else(Vector3::zeros),
    })
}
