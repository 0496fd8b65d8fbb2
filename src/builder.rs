use tracing::warn;

use crate::context::FeatureContext;

/// Configures the process-wide feature context. Applied when dropped, so a
/// bare `server_features::init().version("3.4.0");` is enough.
pub struct ContextBuilder {
    target: &'static FeatureContext,
    version: Option<String>,
    remote: Option<String>,
    api_key: Option<String>,
    fallback: Option<String>,
    consumed: bool,
}

pub fn create_builder(target: &'static FeatureContext) -> ContextBuilder {
    ContextBuilder {
        target,
        version: None,
        remote: None,
        api_key: None,
        fallback: None,
        consumed: false,
    }
}

impl ContextBuilder {
    /// Backend version already known to the caller.
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Base URL of the backend; its health endpoint is asked for the version.
    pub fn remote(mut self, url: &str) -> Self {
        self.remote = Some(url.to_string());
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Used when the remote cannot be reached or does not report a version.
    pub fn fallback_version(mut self, version: &str) -> Self {
        self.fallback = Some(version.to_string());
        self
    }

    fn apply_fallback(&self) {
        match &self.fallback {
            Some(version) => {
                self.target.set_server_version(version);
            }
            None => self.target.reset(),
        }
    }
}

impl Drop for ContextBuilder {
    fn drop(&mut self) {
        if self.consumed {
            return;
        }
        self.consumed = true;

        match &self.remote {
            None => match &self.version {
                Some(version) => {
                    self.target.set_server_version(version);
                }
                None => {
                    if self.fallback.is_some() {
                        self.apply_fallback();
                    }
                }
            },
            Some(url) => {
                #[cfg(feature = "remote")]
                {
                    match crate::remote::fetch_server_version(url, self.api_key.as_deref()) {
                        Ok(version) => {
                            self.target.set_server_version(&version);
                        }
                        Err(e) => {
                            warn!(url = %url, error = %e, "could not read backend version, using fallback");
                            self.apply_fallback();
                        }
                    }
                }
                #[cfg(not(feature = "remote"))]
                {
                    let _ = &self.api_key;
                    warn!(
                        url = %url,
                        "remote mode requires the 'remote' feature, using fallback"
                    );
                    self.apply_fallback();
                }
            }
        }
    }
}
