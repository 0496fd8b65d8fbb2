use std::env;

use serde::Deserialize;
use tracing::warn;

/// features.toml
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FeaturesConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Base URL of the backend whose health endpoint reports its version.
    pub server_url: Option<String>,
    pub api_key: Option<String>,
    /// Version to publish when no backend is asked.
    pub server_version: Option<String>,
    pub poll_secs: Option<u64>,
}

fn default_port() -> u16 {
    8080
}

fn default_hostname() -> String {
    "0.0.0.0".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            hostname: default_hostname(),
            server_url: None,
            api_key: None,
            server_version: None,
            poll_secs: None,
        }
    }
}

impl FeaturesConfig {
    /// Load configuration from a TOML file, falling back to defaults if the file
    /// doesn't exist or cannot be parsed.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path, error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Load and apply environment overrides.
    pub fn load_with_env(path: &str) -> Self {
        let mut config = Self::load(path);
        config.apply_env_overrides();
        config
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("FEATURES_SERVER_URL") {
            self.server_url = Some(val);
        }

        if let Some(val) = var("FEATURES_API_KEY") {
            self.api_key = Some(val);
        }

        if let Some(val) = var("FEATURES_SERVER_VERSION") {
            self.server_version = Some(val);
        }

        if let Some(val) = var("FEATURES_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %val, "ignoring invalid FEATURES_PORT"),
            }
        }
    }
}
