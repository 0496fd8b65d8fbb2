use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use notify::{EventKind, RecursiveMode, Watcher};
use tracing::{info, warn};

use super::state::AppState;
use crate::config::FeaturesConfig;

/// Check whether a notify event touches the config file.
fn event_affects_config(event: &notify::Event, config: &Path) -> bool {
    let Some(name) = config.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(name))
}

/// Re-reads the config and publishes its `server_version`. Returns whether a
/// new set was published. A version pinned on the command line outranks the
/// file, and a config without `server_version` keeps the current set.
fn reload_config(state: &AppState, path: &Path, pinned: bool) -> bool {
    if pinned {
        info!(path = %path.display(), "config changed, server version pinned on the command line");
        return false;
    }

    let config = FeaturesConfig::load_with_env(&path.to_string_lossy());
    match config.server_version {
        Some(version) => {
            let set = state.features.set_server_version(&version);
            info!(
                version = %version,
                enabled = set.enabled().count(),
                "config reloaded"
            );
            true
        }
        None => {
            warn!(path = %path.display(), "config has no server_version, keeping current features");
            false
        }
    }
}

/// Republish `server_version` from the config file whenever it changes.
pub async fn watch_config(state: Arc<AppState>, path: PathBuf, pinned: bool) {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);

    let config_path = path.clone();
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if let Ok(event) = res {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                && event_affects_config(&event, &config_path)
            {
                let _ = tx.try_send(());
            }
        }
    })
    .unwrap_or_else(|e| {
        eprintln!("Failed to create file watcher: {}", e);
        process::exit(1);
    });

    let watch_path = path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    watcher
        .watch(&watch_path, RecursiveMode::NonRecursive)
        .unwrap_or_else(|e| {
            eprintln!("Failed to watch {}: {}", watch_path.display(), e);
            process::exit(1);
        });

    println!("Watching {} for changes", path.display());

    // Keep watcher alive for the lifetime of this task
    let _watcher = watcher;

    loop {
        if rx.recv().await.is_none() {
            break;
        }

        // Debounce: wait a bit and drain any extra events
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        while rx.try_recv().is_ok() {}

        reload_config(&state, &path, pinned);
    }
}
