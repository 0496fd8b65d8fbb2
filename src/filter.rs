//! Short URL list filters whose availability depends on the backend.

use crate::context::FeatureContext;
use crate::registry::Feature;

/// Filter selection of the short URL list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortUrlsFilter {
    pub exclude_bots: bool,
}

/// Options a filter menu may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOption {
    ExcludeBots,
}

impl FilterOption {
    pub fn label(self) -> &'static str {
        match self {
            FilterOption::ExcludeBots => "Exclude bots visits",
        }
    }

    fn requires(self) -> Feature {
        match self {
            FilterOption::ExcludeBots => Feature::ExcludeBotsOnShortUrls,
        }
    }
}

const OPTIONS: [FilterOption; 1] = [FilterOption::ExcludeBots];

/// The options the connected backend understands.
pub fn available_filters(features: &FeatureContext) -> Vec<FilterOption> {
    let snapshot = features.snapshot();
    OPTIONS
        .into_iter()
        .filter(|option| snapshot.is_enabled(option.requires()))
        .collect()
}

impl ShortUrlsFilter {
    pub fn toggle_exclude_bots(self) -> Self {
        Self {
            exclude_bots: !self.exclude_bots,
        }
    }

    pub fn clear(self) -> Self {
        Self::default()
    }

    /// Whether anything is selected; a "clear" action is only meaningful then.
    pub fn has_value(&self) -> bool {
        self.exclude_bots
    }

    /// Query parameters for the list request. Selections the backend does
    /// not support are dropped instead of being sent.
    pub fn query_params(&self, features: &FeatureContext) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.exclude_bots && features.is_enabled(Feature::ExcludeBotsOnShortUrls) {
            params.push(("excludeBots", "true".to_string()));
        }
        params
    }
}
