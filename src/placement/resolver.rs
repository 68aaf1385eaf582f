use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info};

use crate::assembly::{self, AssemblyBuilder, AssemblyId};
use crate::description::GeometryDescription;
use crate::error::{Result, VolumeError};
use crate::material::{MaterialLibrary, MaterialRegistry};
use crate::math::Isometry3;
use crate::report::{BuildWarning, Warnings};
use crate::store::GeometryStore;
use crate::volume::{VolumeBuilder, VolumeId};

use super::{PhysicalVolume, PlacementDef, PlacementId, PlacementState};

/// What a placement definition puts into its parent.
#[derive(Debug, Clone, Copy)]
enum Target {
    Volume(VolumeId),
    Assembly(AssemblyId),
}

struct WorkItem<'d> {
    def: &'d PlacementDef,
    target: Target,
}

/// The outcome of resolving a description.
#[derive(Debug)]
pub struct Resolution {
    pub store: GeometryStore,
    /// The world placement, the root of the hierarchy.
    pub world: PlacementId,
    /// One state per placement definition: the description's placements
    /// first, then each assembly's imprints in declaration order.
    pub states: Vec<PlacementState>,
    pub warnings: Warnings,
}

/// Builds every volume of a description and places them under their parents.
///
/// Placement runs on a work queue of placed volumes, starting with the world.
/// When a volume is dequeued, every definition waiting on it as parent is
/// placed, and the volumes this places are queued in turn. Definitions still
/// waiting once the queue drains have a parent that was never placed, either
/// because it does not exist or because it is part of a cycle.
pub struct PlacementResolver<'lib> {
    store: GeometryStore,
    volumes: VolumeBuilder<'lib>,
    assemblies: AssemblyBuilder,
    warnings: Warnings,
    check_extents: bool,
}

impl<'lib> PlacementResolver<'lib> {
    /// Creates a resolver with a fresh store and fresh caches.
    #[must_use]
    pub fn new(materials: MaterialRegistry<'lib>) -> Self {
        Self {
            store: GeometryStore::new(),
            volumes: VolumeBuilder::new(materials),
            assemblies: AssemblyBuilder::new(),
            warnings: Warnings::new(),
            check_extents: false,
        }
    }

    /// Creates a resolver whose material registry knows the description's materials.
    #[must_use]
    pub fn for_description(
        library: &'lib dyn MaterialLibrary,
        description: &GeometryDescription,
    ) -> Self {
        Self::new(MaterialRegistry::new(library, description.materials.iter().cloned()))
    }

    /// Enables the check that each placement stays inside its mother's extent.
    #[must_use]
    pub fn with_extent_check(mut self, enabled: bool) -> Self {
        self.check_extents = enabled;
        self
    }

    /// Builds and places everything the description declares.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error met while building materials, shapes,
    /// volumes or assemblies. Unresolved parents, orphans and nested
    /// assemblies are warnings in the returned [`Resolution`].
    pub fn resolve_all(mut self, description: &GeometryDescription) -> Result<Resolution> {
        let world_volume = self
            .volumes
            .build(&mut self.store, &description.world, &mut self.warnings)?;
        let world = self.store.add_placement(PhysicalVolume {
            name: description.world.name.clone(),
            volume: world_volume,
            mother: None,
            transform: Isometry3::identity(),
            copy_number: 0,
            assembly: None,
        })?;

        for def in &description.volumes {
            self.volumes.build(&mut self.store, def, &mut self.warnings)?;
        }
        for def in &description.assemblies {
            self.assemblies
                .build(&mut self.store, def, &mut self.volumes, &mut self.warnings)?;
        }
        self.report_orphans(description);

        let items = self.work_items(description)?;
        let states = self.place_all(&items, world_volume)?;

        info!(
            volumes = description.volumes.len() + 1,
            placements = self.store.placement_count(),
            warnings = self.warnings.as_slice().len(),
            "placement resolved"
        );
        Ok(Resolution {
            store: self.store,
            world,
            states,
            warnings: self.warnings,
        })
    }

    fn report_orphans(&mut self, description: &GeometryDescription) {
        for def in &description.volumes {
            let placed = description.placements.iter().any(|p| p.volume == def.name)
                || description.assemblies.iter().any(|a| a.uses_volume(&def.name));
            if !placed && def.name != description.world.name {
                self.warnings.push(BuildWarning::Orphan {
                    volume: def.name.clone(),
                });
            }
        }
    }

    fn work_items<'d>(&self, description: &'d GeometryDescription) -> Result<Vec<WorkItem<'d>>> {
        let mut items = Vec::new();
        for def in &description.placements {
            let volume = self
                .volumes
                .get(&def.volume)
                .ok_or_else(|| VolumeError::UnknownVolume(def.volume.clone()))?;
            items.push(WorkItem {
                def,
                target: Target::Volume(volume),
            });
        }
        for assembly in &description.assemblies {
            let Some(id) = self.assemblies.get(&assembly.name) else {
                continue;
            };
            items.extend(assembly.imprints.iter().map(|def| WorkItem {
                def,
                target: Target::Assembly(id),
            }));
        }
        Ok(items)
    }

    fn place_all(&mut self, items: &[WorkItem<'_>], world: VolumeId) -> Result<Vec<PlacementState>> {
        let mut states = vec![PlacementState::Pending; items.len()];
        let mut waiting: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            waiting.entry(item.def.parent.as_str()).or_default().push(i);
        }

        // Instances per volume across all its definitions, for naming.
        let mut totals: HashMap<VolumeId, u32> = HashMap::new();
        for item in items {
            if let Target::Volume(volume) = item.target {
                *totals.entry(volume).or_default() += item.def.copies;
            }
        }
        let mut next_copy: HashMap<VolumeId, u32> = HashMap::new();

        let mut ready = HashSet::from([world]);
        let mut queue = VecDeque::from([world]);
        while let Some(parent) = queue.pop_front() {
            let parent_name = self.store.volume(parent)?.name.clone();
            let Some(indices) = waiting.remove(parent_name.as_str()) else {
                continue;
            };
            for i in indices {
                let item = &items[i];
                let placed = match item.target {
                    Target::Volume(volume) => {
                        let total = totals.get(&volume).copied().unwrap_or(1);
                        let counter = next_copy.entry(volume).or_default();
                        self.place_volume(item.def, volume, parent, total, counter)?;
                        vec![volume]
                    }
                    Target::Assembly(id) => self.imprint(item.def, id, parent)?,
                };
                states[i] = PlacementState::Placed;
                for volume in placed {
                    if ready.insert(volume) {
                        queue.push_back(volume);
                    }
                }
            }
        }

        for (i, item) in items.iter().enumerate() {
            if states[i] == PlacementState::Pending {
                states[i] = PlacementState::UnresolvedParent;
                self.warnings.push(BuildWarning::UnresolvedParent {
                    volume: item.def.volume.clone(),
                    parent: item.def.parent.clone(),
                });
            }
        }
        Ok(states)
    }

    fn place_volume(
        &mut self,
        def: &PlacementDef,
        volume: VolumeId,
        parent: VolumeId,
        total: u32,
        counter: &mut u32,
    ) -> Result<()> {
        for i in 0..def.copies {
            let copy_number = *counter;
            *counter += 1;
            let name = if total > 1 {
                format!("{}_{copy_number}", def.volume)
            } else {
                def.volume.clone()
            };
            let id = self.store.add_placement(PhysicalVolume {
                name,
                volume,
                mother: Some(parent),
                transform: def.instance_transform(i),
                copy_number,
                assembly: None,
            })?;
            debug!(volume = %def.volume, parent = %def.parent, copy_number, "placed volume");
            self.check_extent(id)?;
        }
        Ok(())
    }

    fn imprint(
        &mut self,
        def: &PlacementDef,
        assembly: AssemblyId,
        parent: VolumeId,
    ) -> Result<Vec<VolumeId>> {
        let mut volumes = Vec::new();
        for i in 0..def.copies {
            let transform = def.instance_transform(i);
            for id in assembly::imprint(&mut self.store, assembly, &transform, parent, i)? {
                self.check_extent(id)?;
                volumes.push(self.store.placement(id)?.volume);
            }
        }
        Ok(volumes)
    }

    fn check_extent(&mut self, id: PlacementId) -> Result<()> {
        if !self.check_extents {
            return Ok(());
        }
        let placement = self.store.placement(id)?;
        let Some(mother) = placement.mother else {
            return Ok(());
        };
        let child = self.store.volume(placement.volume)?;
        let child_extent = self
            .store
            .shape(child.shape)?
            .extent
            .transformed(&placement.transform);
        let mother_volume = self.store.volume(mother)?;
        let mother_extent = self.store.shape(mother_volume.shape)?.extent;

        if !mother_extent.contains(&child_extent) {
            let warning = BuildWarning::ExtentExceedsMother {
                placement: placement.name.clone(),
                mother: mother_volume.name.clone(),
            };
            self.warnings.push(warning);
        }
        Ok(())
    }
}
