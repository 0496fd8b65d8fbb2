mod poll;
mod routes;
mod state;
mod watch;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tracing::warn;

use self::poll::poll_backend;
use self::routes::{handle_feature, handle_features, handle_health, handle_set_server_version};
use self::state::AppState;
use self::watch::watch_config;
use crate::config::FeaturesConfig;
use crate::remote::fetch_server_version;

#[derive(Debug)]
pub struct ServeOptions {
    pub port: Option<u16>,
    pub hostname: Option<String>,
    pub config_path: String,
    pub server_version: Option<String>,
    pub server: Option<String>,
    pub watch: bool,
    pub poll: Option<u64>,
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/v1/features", get(handle_features))
        .route("/v1/features/{feature}", get(handle_feature))
        .route("/v1/server-version", put(handle_set_server_version))
        .layer(CompressionLayer::new())
        .with_state(state)
}

pub async fn run_serve(opts: ServeOptions) {
    // CLI args override env vars, which override the config file
    let config = FeaturesConfig::load_with_env(&opts.config_path);
    let port = opts.port.unwrap_or(config.port);
    let hostname = opts.hostname.unwrap_or(config.hostname);
    let server_url = opts.server.or(config.server_url);
    let poll_secs = opts.poll.or(config.poll_secs);
    let pinned = opts.server_version.is_some();

    let state = Arc::new(AppState::new(server_url.clone()));

    // An explicit version wins over asking the backend
    match (opts.server_version.or(config.server_version), &server_url) {
        (Some(version), _) => {
            state.features.set_server_version(&version);
        }
        (None, Some(url)) => {
            let client = reqwest::Client::new();
            match fetch_server_version(&client, url, config.api_key.as_deref()).await {
                Ok(version) => {
                    state.features.set_server_version(&version);
                }
                Err(e) => warn!(error = %e, "could not read backend version, all features disabled"),
            }
        }
        (None, None) => warn!("no backend version configured, all features disabled"),
    }

    if opts.watch {
        let watcher_state = Arc::clone(&state);
        let watcher_path = PathBuf::from(&opts.config_path)
            .canonicalize()
            .unwrap_or_else(|_| PathBuf::from(&opts.config_path));
        tokio::spawn(watch_config(watcher_state, watcher_path, pinned));
    }

    match (server_url, poll_secs) {
        (Some(url), Some(secs)) if secs > 0 => {
            tokio::spawn(poll_backend(
                Arc::clone(&state),
                url,
                config.api_key,
                Duration::from_secs(secs),
            ));
        }
        (None, Some(_)) => warn!("--poll needs a backend URL, not polling"),
        _ => {}
    }

    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", hostname, port);
    match state.features.server_version() {
        Some(version) => println!("Serving features for backend {} on http://{}", version, addr),
        None => println!("Serving features on http://{}", addr),
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Failed to bind to {}: {}", addr, e);
            process::exit(1);
        });

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");

        #[cfg(unix)]
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }

        #[cfg(not(unix))]
        ctrl_c.await.ok();

        println!("Shutdown signal received, finishing in-flight requests...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Server error: {}", e);
            process::exit(1);
        });

    println!("Server stopped");
}
