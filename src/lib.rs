use std::sync::{Arc, OnceLock};

use wasm_bindgen::prelude::wasm_bindgen;

pub mod builder;
pub mod context;
pub mod error;
pub mod filter;
pub mod registry;
pub mod remote;
pub mod resolve;
pub mod version;

pub use context::FeatureContext;
pub use error::{RegistryError, UnknownFeature, VersionError};
pub use registry::{Feature, FeatureKey, FeatureRegistry};
pub use resolve::{resolve, FeatureResolver, ResolvedFeatureSet};
pub use version::SemanticVersion;

static CONTEXT: OnceLock<FeatureContext> = OnceLock::new();

/// Returns a builder that sets the backend version of the process-wide
/// context when it goes out of scope.
///
/// # Examples
/// ```no_run
/// // Version already known
/// server_features::init().version("3.4.0");
///
/// // Ask the backend, fall back when unreachable
/// server_features::init()
///     .remote("https://s.example.com")
///     .api_key("f0e1d2")
///     .fallback_version("3.0.0");
/// ```
#[cfg(not(target_arch = "wasm32"))]
pub fn init() -> builder::ContextBuilder {
    builder::create_builder(context())
}

/// The process-wide feature context. All features are off until a backend
/// version is set.
pub fn context() -> &'static FeatureContext {
    CONTEXT.get_or_init(FeatureContext::default)
}

/// Whether `feature` is usable with the currently connected backend.
pub fn feature(feature: Feature) -> bool {
    context().is_enabled(feature)
}

/// Snapshot of every feature for the currently connected backend.
pub fn features() -> Arc<ResolvedFeatureSet> {
    context().snapshot()
}

/// Records the version reported by the connected backend.
pub fn set_server_version(version: &str) {
    context().set_server_version(version);
}

/// JSON object of every feature resolved against `version`.
#[wasm_bindgen]
pub fn resolve_wasm(version: &str) -> String {
    resolve(version).to_json().to_string()
}

/// Unknown feature ids are reported as disabled.
#[wasm_bindgen]
pub fn feature_enabled_wasm(feature: &str, version: &str) -> bool {
    match feature.parse::<Feature>() {
        Ok(feature) => resolve(version).is_enabled(feature),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_wasm_is_json() {
        let out: serde_json::Value = serde_json::from_str(&resolve_wasm("3.4.0")).unwrap();
        assert_eq!(out["version"], "3.4.0");
        assert_eq!(out["features"]["excludeBotsOnShortUrls"], true);
        assert_eq!(out["features"]["deviceLongUrls"], false);
    }

    #[test]
    fn test_feature_enabled_wasm() {
        assert!(feature_enabled_wasm("forwardQuery", "2.9.0"));
        assert!(!feature_enabled_wasm("forwardQuery", "2.8.9"));
        assert!(!feature_enabled_wasm("noSuchFeature", "9.9.9"));
        assert!(!feature_enabled_wasm("forwardQuery", "bogus"));
    }

    #[test]
    fn test_global_context() {
        // The global is shared by every test in this binary, so this is the
        // only test that writes to it.
        assert!(!feature(Feature::DeviceLongUrls));
        init().version("3.5.0");
        assert!(feature(Feature::DeviceLongUrls));
        assert_eq!(features().enabled().count(), Feature::ALL.len());

        set_server_version("3.0.0");
        assert!(feature(Feature::NonOrphanVisits));
        assert!(!feature(Feature::DomainVisits));
    }
}
