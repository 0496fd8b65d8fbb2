use core::fmt;
use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use crate::error::{RegistryError, UnknownFeature};
use crate::version::{self, SemanticVersion};

/// A closed set of features, each with a minimum backend version.
///
/// Implemented by [`Feature`] for the built-in table. Any other closed enum
/// can implement it to be resolved the same way.
pub trait FeatureKey: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every member, in table order.
    fn all() -> &'static [Self];

    /// Stable identifier used in JSON and on the command line.
    fn id(self) -> &'static str;

    /// Minimum backend version as written in the table.
    fn min_version(self) -> &'static str;
}

/// Declares the built-in feature table. The enum, `ALL`, `id` and
/// `min_version` are all generated from one list, so a feature cannot exist
/// without a row in each.
macro_rules! feature_table {
    ($($variant:ident => ($id:literal, $min:literal),)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Feature {
            $($variant,)+
        }

        impl Feature {
            /// Every feature, in declaration order.
            pub const ALL: [Feature; [$(stringify!($variant)),+].len()] = [$(Feature::$variant),+];

            pub const fn id(self) -> &'static str {
                match self {
                    $(Feature::$variant => $id,)+
                }
            }

            pub const fn min_version(self) -> &'static str {
                match self {
                    $(Feature::$variant => $min,)+
                }
            }
        }
    };
}

feature_table! {
    ForwardQuery => ("forwardQuery", "2.9.0"),
    NonRestCors => ("nonRestCors", "2.9.0"),
    DefaultDomainRedirectsEdition => ("defaultDomainRedirectsEdition", "2.10.0"),
    NonOrphanVisits => ("nonOrphanVisits", "3.0.0"),
    AllTagsFiltering => ("allTagsFiltering", "3.0.0"),
    TagsStats => ("tagsStats", "3.0.0"),
    DomainVisits => ("domainVisits", "3.1.0"),
    ExcludeBotsOnShortUrls => ("excludeBotsOnShortUrls", "3.4.0"),
    FilterDisabledUrls => ("filterDisabledUrls", "3.4.0"),
    DeviceLongUrls => ("deviceLongUrls", "3.5.0"),
}

// `ALL[i]` is the variant with discriminant `i`, and the last variant closes it.
const _: () = {
    let mut i = 0;
    while i < Feature::ALL.len() {
        assert!(Feature::ALL[i] as usize == i);
        i += 1;
    }
    assert!(Feature::ALL.len() == Feature::DeviceLongUrls as usize + 1);
};

impl FeatureKey for Feature {
    fn all() -> &'static [Self] {
        &Feature::ALL
    }

    fn id(self) -> &'static str {
        Feature::id(self)
    }

    fn min_version(self) -> &'static str {
        Feature::min_version(self)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|feature| feature.id() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

/// The feature table with every minimum version parsed up front.
#[derive(Debug, Clone)]
pub struct FeatureRegistry<F: FeatureKey = Feature> {
    minimums: HashMap<F, SemanticVersion>,
}

impl<F: FeatureKey> FeatureRegistry<F> {
    /// Parses the minimum of every member of `F`.
    pub fn load() -> Result<Self, RegistryError> {
        let mut minimums = HashMap::with_capacity(F::all().len());
        for &feature in F::all() {
            let minimum = version::parse(feature.min_version()).map_err(|source| {
                RegistryError::InvalidRequirement {
                    feature: feature.id(),
                    source,
                }
            })?;
            minimums.insert(feature, minimum);
        }
        Ok(Self { minimums })
    }

    /// The minimum version string exactly as the table declares it.
    pub fn minimum_version_for(&self, feature: F) -> &'static str {
        feature.min_version()
    }

    /// Parsed minimum, `None` for a value `F::all()` does not list. Such a
    /// feature never resolves as enabled.
    pub fn minimum(&self, feature: F) -> Option<SemanticVersion> {
        self.minimums.get(&feature).copied()
    }

    /// `(feature, minimum)` pairs in table order.
    pub fn entries(&self) -> impl Iterator<Item = (F, SemanticVersion)> + '_ {
        F::all()
            .iter()
            .filter_map(move |&feature| Some((feature, self.minimum(feature)?)))
    }

    pub fn len(&self) -> usize {
        self.minimums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minimums.is_empty()
    }
}

static BUILTIN: OnceLock<Arc<FeatureRegistry<Feature>>> = OnceLock::new();

/// The process-wide built-in registry.
///
/// Panics if an entry of the [`Feature`] table is malformed. The table is
/// compiled in, so that is a programming error, not bad input.
pub fn builtin() -> Arc<FeatureRegistry<Feature>> {
    let registry = BUILTIN.get_or_init(|| {
        Arc::new(
            FeatureRegistry::load()
                .unwrap_or_else(|e| panic!("built-in feature table is invalid: {}", e)),
        )
    });
    Arc::clone(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Broken {
        Fine,
        Typo,
    }

    impl FeatureKey for Broken {
        fn all() -> &'static [Self] {
            &[Broken::Fine, Broken::Typo]
        }

        fn id(self) -> &'static str {
            match self {
                Broken::Fine => "fine",
                Broken::Typo => "typo",
            }
        }

        fn min_version(self) -> &'static str {
            match self {
                Broken::Fine => "1.0.0",
                Broken::Typo => "1.0",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Partial {
        Listed,
        Forgotten,
    }

    impl FeatureKey for Partial {
        fn all() -> &'static [Self] {
            &[Partial::Listed]
        }

        fn id(self) -> &'static str {
            match self {
                Partial::Listed => "listed",
                Partial::Forgotten => "forgotten",
            }
        }

        fn min_version(self) -> &'static str {
            "1.0.0"
        }
    }

    #[test]
    fn test_builtin_table_loads() {
        let registry = builtin();
        assert_eq!(registry.len(), Feature::ALL.len());
        assert_eq!(
            registry.minimum(Feature::DefaultDomainRedirectsEdition),
            Some(SemanticVersion::new(2, 10, 0))
        );
    }

    #[test]
    fn test_minimum_version_for() {
        let registry = builtin();
        assert_eq!(registry.minimum_version_for(Feature::ForwardQuery), "2.9.0");
        assert_eq!(registry.minimum_version_for(Feature::NonOrphanVisits), "3.0.0");
        assert_eq!(registry.minimum_version_for(Feature::DomainVisits), "3.1.0");
        assert_eq!(
            registry.minimum_version_for(Feature::ExcludeBotsOnShortUrls),
            "3.4.0"
        );
        assert_eq!(registry.minimum_version_for(Feature::DeviceLongUrls), "3.5.0");
    }

    #[test]
    fn test_entries_follow_table_order() {
        let ids: Vec<&str> = builtin().entries().map(|(f, _)| f.id()).collect();
        assert_eq!(ids.first(), Some(&"forwardQuery"));
        assert_eq!(ids.last(), Some(&"deviceLongUrls"));
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_feature_ids_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(feature.id().parse::<Feature>().unwrap(), feature);
            assert_eq!(feature.to_string(), feature.id());
        }
    }

    #[test]
    fn test_unknown_feature_id() {
        let err = "ForwardQuery".parse::<Feature>().unwrap_err();
        assert_eq!(err, UnknownFeature("ForwardQuery".to_string()));
        assert!("".parse::<Feature>().is_err());
    }

    #[test]
    fn test_all_lists_every_variant_in_order() {
        for (i, feature) in Feature::ALL.iter().enumerate() {
            assert_eq!(*feature as usize, i);
        }
        assert_eq!(Feature::ALL.len(), 10);
        assert_eq!(Feature::ALL[9], Feature::DeviceLongUrls);
        assert_eq!(Feature::DeviceLongUrls.min_version(), "3.5.0");
    }

    #[test]
    fn test_unlisted_value_has_no_minimum() {
        let registry = FeatureRegistry::<Partial>::load().unwrap();
        assert_eq!(registry.minimum(Partial::Forgotten), None);
        assert_eq!(
            registry.minimum(Partial::Listed),
            Some(SemanticVersion::new(1, 0, 0))
        );
        assert_eq!(registry.entries().count(), 1);

        let set = crate::resolve::resolve_with(&registry, "9.9.9");
        assert!(set.is_enabled(Partial::Listed));
        assert!(!set.is_enabled(Partial::Forgotten));
    }

    #[test]
    fn test_malformed_minimum_fails_load() {
        let err = FeatureRegistry::<Broken>::load().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidRequirement { feature: "typo", .. }
        ));
    }
}
