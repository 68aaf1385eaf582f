use slotmap::SlotMap;

use crate::assembly::{Assembly, AssemblyId};
use crate::error::VolumeError;
use crate::material::{Material, MaterialId};
use crate::placement::{PhysicalVolume, PlacementId};
use crate::shape::{ShapeData, ShapeId};
use crate::volume::{LogicalVolume, VolumeId};

/// Central arena that owns every entity of one geometry build.
///
/// Entities reference each other via typed IDs (generational indices). A
/// rebuild creates a new store; IDs from a previous store must not be used
/// with it.
#[derive(Debug, Default)]
pub struct GeometryStore {
    materials: SlotMap<MaterialId, Material>,
    shapes: SlotMap<ShapeId, ShapeData>,
    volumes: SlotMap<VolumeId, LogicalVolume>,
    placements: SlotMap<PlacementId, PhysicalVolume>,
    assemblies: SlotMap<AssemblyId, Assembly>,
}

impl GeometryStore {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Material operations ---

    /// Inserts a material and returns its ID.
    pub fn add_material(&mut self, data: Material) -> MaterialId {
        self.materials.insert(data)
    }

    /// Returns a reference to the material, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn material(&self, id: MaterialId) -> Result<&Material, VolumeError> {
        self.materials
            .get(id)
            .ok_or(VolumeError::EntityNotFound("material"))
    }

    /// Returns the number of materials in the store.
    #[must_use]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    // --- Shape operations ---

    /// Inserts a shape and returns its ID.
    pub fn add_shape(&mut self, data: ShapeData) -> ShapeId {
        self.shapes.insert(data)
    }

    /// Returns a reference to the shape, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn shape(&self, id: ShapeId) -> Result<&ShapeData, VolumeError> {
        self.shapes.get(id).ok_or(VolumeError::EntityNotFound("shape"))
    }

    /// Returns the number of shapes in the store, including boolean intermediates.
    #[must_use]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    // --- Logical volume operations ---

    /// Inserts a logical volume and returns its ID.
    pub fn add_volume(&mut self, data: LogicalVolume) -> VolumeId {
        self.volumes.insert(data)
    }

    /// Returns a reference to the logical volume, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn volume(&self, id: VolumeId) -> Result<&LogicalVolume, VolumeError> {
        self.volumes
            .get(id)
            .ok_or(VolumeError::EntityNotFound("volume"))
    }

    /// Returns a mutable reference to the logical volume, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn volume_mut(&mut self, id: VolumeId) -> Result<&mut LogicalVolume, VolumeError> {
        self.volumes
            .get_mut(id)
            .ok_or(VolumeError::EntityNotFound("volume"))
    }

    /// Iterates over all logical volumes.
    pub fn volumes(&self) -> impl Iterator<Item = (VolumeId, &LogicalVolume)> {
        self.volumes.iter()
    }

    /// Iterates mutably over all logical volumes.
    pub fn volumes_mut(&mut self) -> impl Iterator<Item = (VolumeId, &mut LogicalVolume)> {
        self.volumes.iter_mut()
    }

    // --- Placement operations ---

    /// Inserts a placement and registers it as a daughter of its mother volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the mother volume is not in the store.
    pub fn add_placement(&mut self, data: PhysicalVolume) -> Result<PlacementId, VolumeError> {
        let mother = data.mother;
        if let Some(mother) = mother {
            if !self.volumes.contains_key(mother) {
                return Err(VolumeError::EntityNotFound("mother volume"));
            }
        }
        let id = self.placements.insert(data);
        if let Some(mother) = mother {
            self.volume_mut(mother)?.daughters.push(id);
        }
        Ok(id)
    }

    /// Returns a reference to the placement, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn placement(&self, id: PlacementId) -> Result<&PhysicalVolume, VolumeError> {
        self.placements
            .get(id)
            .ok_or(VolumeError::EntityNotFound("placement"))
    }

    /// Iterates over all placements.
    pub fn placements(&self) -> impl Iterator<Item = (PlacementId, &PhysicalVolume)> {
        self.placements.iter()
    }

    /// Returns the number of placements in the store, the world included.
    #[must_use]
    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    // --- Assembly operations ---

    /// Inserts an assembly and returns its ID.
    pub fn add_assembly(&mut self, data: Assembly) -> AssemblyId {
        self.assemblies.insert(data)
    }

    /// Returns a reference to the assembly, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn assembly(&self, id: AssemblyId) -> Result<&Assembly, VolumeError> {
        self.assemblies
            .get(id)
            .ok_or(VolumeError::EntityNotFound("assembly"))
    }

    /// Returns a mutable reference to the assembly, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn assembly_mut(&mut self, id: AssemblyId) -> Result<&mut Assembly, VolumeError> {
        self.assemblies
            .get_mut(id)
            .ok_or(VolumeError::EntityNotFound("assembly"))
    }
}
