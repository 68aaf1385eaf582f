use thiserror::Error;
use tracing::warn;

/// A non-fatal condition met while building a geometry.
///
/// Warnings never abort a build; the affected element is skipped and the
/// resulting geometry is usable but possibly incomplete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildWarning {
    #[error("volume `{volume}` could not be placed: parent `{parent}` was never placed")]
    UnresolvedParent { volume: String, parent: String },

    #[error("volume `{volume}` was built but has no placement")]
    Orphan { volume: String },

    #[error("assembly `{assembly}` contains nested assembly `{component}`, which is not supported")]
    NestedAssembly { assembly: String, component: String },

    #[error("shape `{shape}` skipped component referencing unbuilt shape `{reference}`")]
    SkippedBooleanComponent { shape: String, reference: String },

    #[error("hits collection `{collection}` lists volume `{volume}`, which is not active in it")]
    HitsCollectionMismatch { collection: String, volume: String },

    #[error("placement `{placement}` extends outside its mother volume `{mother}`")]
    ExtentExceedsMother { placement: String, mother: String },
}

/// Collects the warnings of one build, logging each as it is recorded.
#[derive(Debug, Default, Clone)]
pub struct Warnings {
    entries: Vec<BuildWarning>,
}

impl Warnings {
    /// Creates an empty warning sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn push(&mut self, warning: BuildWarning) {
        warn!(%warning, "geometry build warning");
        self.entries.push(warning);
    }

    /// Returns the recorded warnings in the order they occurred.
    #[must_use]
    pub fn as_slice(&self) -> &[BuildWarning] {
        &self.entries
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consumes the sink, returning the recorded warnings.
    #[must_use]
    pub fn into_vec(self) -> Vec<BuildWarning> {
        self.entries
    }
}
