use thiserror::Error;

/// Raised when a string is not a plain `<major>.<minor>.<patch>` version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("malformed version {input:?}: expected <major>.<minor>.<patch>")]
    MalformedVersion { input: String },
}

/// A feature table entry whose minimum version does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("feature {feature} has an invalid minimum version: {source}")]
    InvalidRequirement {
        feature: &'static str,
        #[source]
        source: VersionError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown feature {0:?}")]
pub struct UnknownFeature(pub String);

#[cfg(feature = "remote")]
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("health request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health response from {url} has no version field")]
    MissingVersion { url: String },
}
