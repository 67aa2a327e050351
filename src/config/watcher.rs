//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::auth::AuthenticatorRegistry;
use crate::config::loader::load_config_with;
use crate::config::schema::GatekeeperConfig;

/// Watches the configuration file and sends every successfully validated
/// reload over a channel.
pub struct ConfigWatcher {
    path: PathBuf,
    registry: AuthenticatorRegistry,
    update_tx: mpsc::UnboundedSender<GatekeeperConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    ///
    /// `registry` holds the application-provided authenticators that reloaded
    /// files may reference.
    pub fn new(path: &Path, registry: AuthenticatorRegistry) -> (Self, mpsc::UnboundedReceiver<GatekeeperConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                registry,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            registry,
            update_tx,
        } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!(path = ?path, "Config file change detected, reloading");
                    match load_config_with(&path, &registry) {
                        Ok(config) => {
                            let _ = update_tx.send(config);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config; keeping current gatekeeper");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watched, "Config watcher started");
        Ok(watcher)
    }
}
