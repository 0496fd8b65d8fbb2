use server_features::FeatureContext;

/// Shared application state for the HTTP server.
pub struct AppState {
    /// Feature set of the backend this server reports on.
    pub features: FeatureContext,
    /// Backend base URL, when the version is read from a live backend.
    pub server_url: Option<String>,
}

impl AppState {
    pub fn new(server_url: Option<String>) -> Self {
        Self {
            features: FeatureContext::default(),
            server_url,
        }
    }
}
