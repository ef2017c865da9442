use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use strata_stream::LodTable;
use strata_world::{
    ConfigError, ConfigEvent, ConfigNotifier, GenSettings, StrataConfig, load_config_from_path,
};

// Editors write a file in several steps; wait this long for the burst to settle.
const SETTLE: Duration = Duration::from_millis(50);

#[derive(Debug, PartialEq, Eq)]
pub enum ReloadOutcome {
    Applied,
    /// New file parsed but has `auto_update = false`.
    Skipped,
    /// Unreadable, unparsable, or rejected by the streaming checks.
    Failed,
}

/// Accepts a freshly loaded config as `current` and announces it.
///
/// The config is checked as a whole (chunk size against the LOD table) before
/// anything is published; on failure the previous config stays in place.
/// Subscribers install the accepted config themselves.
pub fn apply_reload(
    current: &mut StrataConfig,
    loaded: Result<StrataConfig, ConfigError>,
    notifier: &ConfigNotifier,
) -> ReloadOutcome {
    match loaded {
        Ok(cfg) if !cfg.terrain.auto_update => {
            log::info!("config changed but auto_update is off; keeping current settings");
            ReloadOutcome::Skipped
        }
        Ok(cfg) => {
            let settings = GenSettings::from_config(&cfg);
            if let Err(e) = LodTable::for_settings(&settings, &cfg.streaming) {
                log::warn!("config rejected: {}", e);
                return ReloadOutcome::Failed;
            }
            *current = cfg;
            notifier.notify(ConfigEvent::Reloaded);
            ReloadOutcome::Applied
        }
        Err(e) => {
            log::warn!("config reload failed: {}", e);
            ReloadOutcome::Failed
        }
    }
}

/// Watches one config file and republishes it through a [`ConfigNotifier`].
pub struct ConfigReloader {
    path: PathBuf,
    config: StrataConfig,
    notifier: Arc<ConfigNotifier>,
    changes: Receiver<()>,
    _watcher: RecommendedWatcher,
}

impl ConfigReloader {
    pub fn new(path: &Path, config: StrataConfig) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel::<()>();
        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    match event.kind {
                        EventKind::Modify(_)
                        | EventKind::Create(_)
                        | EventKind::Remove(_)
                        | EventKind::Any => {
                            let _ = tx.send(());
                        }
                        _ => {}
                    }
                }
            })?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;
        log::info!("watching {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            config,
            notifier: Arc::new(ConfigNotifier::new()),
            changes: rx,
            _watcher: watcher,
        })
    }

    #[inline]
    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    #[inline]
    pub fn notifier(&self) -> &Arc<ConfigNotifier> {
        &self.notifier
    }

    /// Handles any pending file events without blocking.
    pub fn poll(&mut self) -> Option<ReloadOutcome> {
        let mut changed = false;
        for _ in self.changes.try_iter() {
            changed = true;
        }
        changed.then(|| self.reload())
    }

    /// Blocks until the file changes (or `timeout` passes) and handles it.
    pub fn wait(&mut self, timeout: Duration) -> Option<ReloadOutcome> {
        match self.changes.recv_timeout(timeout) {
            Ok(()) => {
                std::thread::sleep(SETTLE);
                for _ in self.changes.try_iter() {}
                Some(self.reload())
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("config watcher stopped");
                None
            }
        }
    }

    fn reload(&mut self) -> ReloadOutcome {
        if !self.path.exists() {
            log::warn!("config missing: {}", self.path.display());
            return ReloadOutcome::Failed;
        }
        let loaded = load_config_from_path(&self.path);
        let outcome = apply_reload(&mut self.config, loaded, &self.notifier);
        if outcome == ReloadOutcome::Applied {
            log::info!("config reloaded from {}", self.path.display());
        }
        outcome
    }
}
