use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::registry::{self, Feature, FeatureKey, FeatureRegistry};
use crate::version::{self, SemanticVersion};

/// Enabled/disabled state of every feature for one backend version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFeatureSet<F: FeatureKey = Feature> {
    version: Option<SemanticVersion>,
    flags: HashMap<F, bool>,
}

impl<F: FeatureKey> ResolvedFeatureSet<F> {
    /// Every feature off. Used when the backend version is unusable.
    pub fn disabled() -> Self {
        Self {
            version: None,
            flags: F::all().iter().map(|&feature| (feature, false)).collect(),
        }
    }

    pub fn is_enabled(&self, feature: F) -> bool {
        self.flags.get(&feature).copied().unwrap_or(false)
    }

    /// The backend version this set was resolved against, `None` when the
    /// reported version did not parse.
    pub fn version(&self) -> Option<SemanticVersion> {
        self.version
    }

    /// `(feature, enabled)` in table order.
    pub fn iter(&self) -> impl Iterator<Item = (F, bool)> + '_ {
        F::all()
            .iter()
            .map(move |&feature| (feature, self.is_enabled(feature)))
    }

    pub fn enabled(&self) -> impl Iterator<Item = F> + '_ {
        self.iter()
            .filter_map(|(feature, on)| if on { Some(feature) } else { None })
    }

    /// `{ "forwardQuery": true, ... }`
    pub fn flags_json(&self) -> Value {
        let mut map = Map::with_capacity(self.flags.len());
        for (feature, on) in self.iter() {
            map.insert(feature.id().to_string(), Value::Bool(on));
        }
        Value::Object(map)
    }

    /// `{ "version": "3.4.0" | null, "features": { ... } }`
    pub fn to_json(&self) -> Value {
        json!({
            "version": self.version.map(|v| v.to_string()),
            "features": self.flags_json(),
        })
    }
}

/// Resolve against the built-in registry.
pub fn resolve(backend_version: &str) -> ResolvedFeatureSet<Feature> {
    resolve_with(&*registry::builtin(), backend_version)
}

/// Resolve a reported backend version against `registry`.
///
/// An unparsable version enables nothing.
pub fn resolve_with<F: FeatureKey>(
    registry: &FeatureRegistry<F>,
    backend_version: &str,
) -> ResolvedFeatureSet<F> {
    match version::parse(backend_version) {
        Ok(parsed) => resolve_version(registry, parsed),
        Err(e) => {
            warn!(error = %e, "backend reported an unusable version, disabling all features");
            ResolvedFeatureSet::disabled()
        }
    }
}

pub fn resolve_version<F: FeatureKey>(
    registry: &FeatureRegistry<F>,
    backend_version: SemanticVersion,
) -> ResolvedFeatureSet<F> {
    let flags = registry
        .entries()
        .map(|(feature, minimum)| (feature, backend_version.satisfies(&minimum)))
        .collect();
    ResolvedFeatureSet {
        version: Some(backend_version),
        flags,
    }
}

/// Resolves against one registry and remembers the last result, so asking
/// again with an unchanged version string hands back the same snapshot.
#[derive(Debug)]
pub struct FeatureResolver<F: FeatureKey = Feature> {
    registry: Arc<FeatureRegistry<F>>,
    last: Mutex<Option<(String, Arc<ResolvedFeatureSet<F>>)>>,
}

impl<F: FeatureKey> FeatureResolver<F> {
    pub fn new(registry: Arc<FeatureRegistry<F>>) -> Self {
        Self {
            registry,
            last: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<FeatureRegistry<F>> {
        &self.registry
    }

    pub fn resolve(&self, backend_version: &str) -> Arc<ResolvedFeatureSet<F>> {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((seen, set)) = last.as_ref() {
            if seen == backend_version {
                debug!(version = backend_version, "feature set unchanged, reusing");
                return Arc::clone(set);
            }
        }
        let set = Arc::new(resolve_with(&*self.registry, backend_version));
        *last = Some((backend_version.to_string(), Arc::clone(&set)));
        set
    }
}

impl Default for FeatureResolver<Feature> {
    fn default() -> Self {
        Self::new(registry::builtin())
    }
}
