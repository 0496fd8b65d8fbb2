use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use crate::registry::{self, Feature, FeatureKey, FeatureRegistry};
use crate::resolve::{resolve_version, FeatureResolver, ResolvedFeatureSet};
use crate::version::SemanticVersion;

/// Holds the feature set of the currently connected backend.
///
/// Share it by reference or `Arc` with whatever needs to ask about features.
/// Readers always get a complete snapshot: an update builds a new set and
/// swaps the `Arc` under the write lock, nothing is patched in place.
#[derive(Debug)]
pub struct FeatureContext<F: FeatureKey = Feature> {
    resolver: FeatureResolver<F>,
    initial: Arc<ResolvedFeatureSet<F>>,
    current: RwLock<Arc<ResolvedFeatureSet<F>>>,
}

impl<F: FeatureKey> FeatureContext<F> {
    /// Starts out as if resolved against `0.0.0`.
    pub fn new(registry: Arc<FeatureRegistry<F>>) -> Self {
        let initial = Arc::new(resolve_version(&*registry, SemanticVersion::ZERO));
        Self {
            resolver: FeatureResolver::new(registry),
            current: RwLock::new(Arc::clone(&initial)),
            initial,
        }
    }

    /// Current state of one feature. Ask again after every decision point,
    /// the answer changes when the backend does.
    pub fn is_enabled(&self, feature: F) -> bool {
        self.snapshot().is_enabled(feature)
    }

    /// The whole current set. Holding on to it keeps that version's view
    /// alive, later updates do not touch it.
    pub fn snapshot(&self) -> Arc<ResolvedFeatureSet<F>> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*current)
    }

    /// Version the current set was resolved against. `None` after the
    /// backend reported something unparsable.
    pub fn server_version(&self) -> Option<SemanticVersion> {
        self.snapshot().version()
    }

    /// The active backend is now at `version`. Resolves and publishes the
    /// new set, which is also returned.
    pub fn set_server_version(&self, version: &str) -> Arc<ResolvedFeatureSet<F>> {
        let set = self.resolver.resolve(version);
        self.publish(Arc::clone(&set));
        set
    }

    /// Back to the all-disabled start state, e.g. when disconnected.
    pub fn reset(&self) {
        self.publish(Arc::clone(&self.initial));
    }

    pub fn registry(&self) -> &Arc<FeatureRegistry<F>> {
        self.resolver.registry()
    }

    fn publish(&self, set: Arc<ResolvedFeatureSet<F>>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if Arc::ptr_eq(&*current, &set) {
            debug!("feature set already published");
            return;
        }
        if current.version() != set.version() {
            info!(
                from = ?current.version().map(|v| v.to_string()),
                to = ?set.version().map(|v| v.to_string()),
                enabled = set.enabled().count(),
                "publishing feature set"
            );
        }
        *current = set;
    }
}

impl Default for FeatureContext<Feature> {
    fn default() -> Self {
        Self::new(registry::builtin())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_starts_all_disabled() {
        let ctx: FeatureContext = FeatureContext::default();
        for feature in Feature::ALL {
            assert!(!ctx.is_enabled(feature));
        }
        assert_eq!(ctx.server_version(), Some(SemanticVersion::ZERO));
    }

    #[test]
    fn test_set_server_version_publishes() {
        let ctx: FeatureContext = FeatureContext::default();
        ctx.set_server_version("3.4.0");
        assert!(ctx.is_enabled(Feature::ExcludeBotsOnShortUrls));
        assert!(!ctx.is_enabled(Feature::DeviceLongUrls));
        assert_eq!(ctx.server_version(), Some(SemanticVersion::new(3, 4, 0)));

        ctx.set_server_version("3.5.0");
        assert!(ctx.is_enabled(Feature::DeviceLongUrls));
    }

    #[test]
    fn test_old_snapshot_is_untouched_by_update() {
        let ctx: FeatureContext = FeatureContext::default();
        ctx.set_server_version("2.9.0");
        let before = ctx.snapshot();
        ctx.set_server_version("3.5.0");
        assert!(!before.is_enabled(Feature::DeviceLongUrls));
        assert!(ctx.snapshot().is_enabled(Feature::DeviceLongUrls));
    }

    #[test]
    fn test_malformed_version_degrades() {
        let ctx: FeatureContext = FeatureContext::default();
        ctx.set_server_version("3.5.0");
        ctx.set_server_version("definitely not a version");
        assert_eq!(ctx.snapshot().enabled().count(), 0);
        assert_eq!(ctx.server_version(), None);
    }

    #[test]
    fn test_reset() {
        let ctx: FeatureContext = FeatureContext::default();
        ctx.set_server_version("3.5.0");
        ctx.reset();
        assert_eq!(ctx.snapshot().enabled().count(), 0);
        assert_eq!(ctx.server_version(), Some(SemanticVersion::ZERO));
    }

    #[test]
    fn test_unchanged_version_keeps_snapshot() {
        let ctx: FeatureContext = FeatureContext::default();
        let first = ctx.set_server_version("3.1.0");
        ctx.set_server_version("3.1.0");
        assert!(Arc::ptr_eq(&first, &ctx.snapshot()));
    }

    #[test]
    fn test_readers_never_see_a_mixed_set() {
        let ctx: Arc<FeatureContext> = Arc::new(FeatureContext::default());
        let writer = {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for i in 0..500 {
                    ctx.set_server_version(if i % 2 == 0 { "2.9.0" } else { "3.5.0" });
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let set = ctx.snapshot();
                        let expected = match set.version() {
                            Some(v) if v == SemanticVersion::new(3, 5, 0) => Feature::ALL.len(),
                            Some(v) if v == SemanticVersion::new(2, 9, 0) => 2,
                            _ => 0,
                        };
                        assert_eq!(set.enabled().count(), expected);
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
