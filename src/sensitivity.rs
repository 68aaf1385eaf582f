use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, info};

use crate::document::HitsCollectionRecord;
use crate::report::{BuildWarning, Warnings};
use crate::store::GeometryStore;
use crate::volume::VolumeDef;

/// Hits-collection name to the names of the volumes reporting to it.
pub type HitsCollections = BTreeMap<String, BTreeSet<String>>;

/// Marks active volumes as sensitive and groups them by hits collection.
#[derive(Debug, Clone)]
pub struct SensitivityTagger {
    default_collection: String,
}

impl SensitivityTagger {
    /// Creates a tagger that files volumes without a collection under `default_collection`.
    #[must_use]
    pub fn new(default_collection: impl Into<String>) -> Self {
        Self {
            default_collection: default_collection.into(),
        }
    }

    /// Groups every active volume under its hits collection.
    ///
    /// Only the first definition of a name counts, matching how volumes are
    /// memoized.
    pub fn tag_all<'a>(&self, volumes: impl IntoIterator<Item = &'a VolumeDef>) -> HitsCollections {
        let mut seen = HashSet::new();
        let mut collections = HitsCollections::new();
        for def in volumes {
            if !seen.insert(def.name.as_str()) || !def.is_active {
                continue;
            }
            let collection = def
                .hits_collection
                .clone()
                .unwrap_or_else(|| self.default_collection.clone());
            debug!(volume = %def.name, collection = %collection, "tagged sensitive volume");
            collections
                .entry(collection)
                .or_default()
                .insert(def.name.clone());
        }
        collections
    }

    /// Records each tagged volume's collection on its logical volume.
    pub fn attach(&self, store: &mut GeometryStore, collections: &HitsCollections) {
        let by_volume: BTreeMap<&str, &str> = collections
            .iter()
            .flat_map(|(collection, volumes)| {
                volumes.iter().map(move |v| (v.as_str(), collection.as_str()))
            })
            .collect();
        let mut attached = 0usize;
        for (_, volume) in store.volumes_mut() {
            if let Some(collection) = by_volume.get(volume.name.as_str()) {
                volume.sensitive = Some((*collection).to_owned());
                attached += 1;
            }
        }
        info!(
            collections = collections.len(),
            volumes = attached,
            "sensitive volumes attached"
        );
    }
}

/// Warns about volumes a `hitsCollections` declaration lists but that are
/// not tagged into that collection.
pub fn cross_check(
    declared: &[HitsCollectionRecord],
    collections: &HitsCollections,
    warnings: &mut Warnings,
) {
    for record in declared {
        let tagged = collections.get(&record.name);
        for volume in &record.volumes {
            if !tagged.is_some_and(|set| set.contains(volume)) {
                warnings.push(BuildWarning::HitsCollectionMismatch {
                    collection: record.name.clone(),
                    volume: volume.clone(),
                });
            }
        }
    }
}
