use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::state::AppState;
use crate::remote::fetch_server_version;

const BASE_DELAY_MS: u64 = 1_000;
const MAX_DELAY_MS: u64 = 30_000;

/// Exponential backoff: 1s, 2s, 4s, 8s, … capped at 30s
fn backoff_delay(attempt: u32) -> Duration {
    let delay_ms = BASE_DELAY_MS.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
    Duration::from_millis(delay_ms.min(MAX_DELAY_MS))
}

/// One poll: fetch the backend version and publish it. On error nothing is
/// published, so the last set stays in place.
async fn poll_once(
    state: &AppState,
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
) -> Result<(), String> {
    let version = fetch_server_version(client, url, api_key).await?;
    state.features.set_server_version(&version);
    Ok(())
}

/// Re-reads the backend version every `every` and republishes the feature
/// set. A failed fetch keeps whatever was published last and retries with
/// backoff, never waiting longer than `every`.
pub async fn poll_backend(
    state: Arc<AppState>,
    url: String,
    api_key: Option<String>,
    every: Duration,
) {
    let client = reqwest::Client::new();
    let mut attempt: u32 = 0;
    let mut delay = every;

    loop {
        tokio::time::sleep(delay).await;

        delay = match poll_once(&state, &client, &url, api_key.as_deref()).await {
            Ok(()) => {
                attempt = 0;
                every
            }
            Err(e) => {
                warn!(error = %e, attempt, "backend version poll failed");
                let retry = backoff_delay(attempt).min(every);
                attempt = attempt.saturating_add(1);
                retry
            }
        };
    }
}
