use server_features::remote::{health_url, version_from_health};

/// Ask the backend's health endpoint for its version.
pub async fn fetch_server_version(
    client: &reqwest::Client,
    base: &str,
    api_key: Option<&str>,
) -> Result<String, String> {
    let url = health_url(base);
    let mut request = client.get(&url).header("Accept", "application/json");
    if let Some(key) = api_key {
        request = request.header("X-Api-Key", key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| format!("request to {} failed: {}", url, e))?;

    if !response.status().is_success() {
        return Err(format!("{} answered {}", url, response.status()));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| format!("{} returned invalid JSON: {}", url, e))?;

    version_from_health(&body)
        .map(str::to_string)
        .ok_or_else(|| format!("{} did not report a version", url))
}
