//! Configuration file watcher for hot reload.
//!
//! Watches the config file's parent directory (editors often replace the file
//! rather than modify it in place) and delivers each new, valid, changed
//! `GatewayConfig` over a channel. Invalid files are logged and skipped; the
//! running configuration stays in force.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Watches one config file and publishes reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    current: GatewayConfig,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration already in force; identical reloads are not published.
    pub fn new(
        path: &Path,
        current: GatewayConfig,
    ) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching in notify's background thread.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            current,
            update_tx,
        } = self;
        let watch_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|n| n.to_os_string());
        let last = Mutex::new(current);
        let target = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let touches_target = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if !touches_target {
                        return;
                    }
                    let Ok(mut last) = last.lock() else {
                        return;
                    };
                    if let Some(config) = reload(&target, &last) {
                        *last = config.clone();
                        let _ = update_tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "config watcher started");
        Ok(watcher)
    }
}

/// Load the file and return it if it is valid and differs from `last`.
pub(crate) fn reload(path: &Path, last: &GatewayConfig) -> Option<GatewayConfig> {
    match load_config(path) {
        Ok(config) if &config == last => {
            tracing::debug!(path = ?path, "config file touched without changes");
            None
        }
        Ok(config) => {
            tracing::info!(path = ?path, "config reloaded");
            Some(config)
        }
        Err(e) => {
            tracing::error!(
                path = ?path,
                error = %e,
                "failed to reload config, keeping current configuration"
            );
            None
        }
    }
}
