//! Reading the backend version from its health endpoint.

use serde_json::Value;

/// `<base>/rest/health`, tolerating a trailing slash on `base`.
pub fn health_url(base: &str) -> String {
    format!("{}/rest/health", base.trim_end_matches('/'))
}

/// The `version` string of a health response body.
pub fn version_from_health(body: &Value) -> Option<&str> {
    body.get("version").and_then(Value::as_str)
}

/// Fetches the backend version with a blocking request.
#[cfg(feature = "remote")]
pub fn fetch_server_version(
    base: &str,
    api_key: Option<&str>,
) -> Result<String, crate::error::RemoteError> {
    use crate::error::RemoteError;

    let url = health_url(base);
    let client = reqwest::blocking::Client::new();
    let mut request = client.get(&url).header("Accept", "application/json");
    if let Some(key) = api_key {
        request = request.header("X-Api-Key", key);
    }
    let body: Value = request.send()?.error_for_status()?.json()?;
    version_from_health(&body)
        .map(str::to_string)
        .ok_or(RemoteError::MissingVersion { url })
}
