//! Session state: the detected games, the current selection and the
//! unapplied change counter, all behind one lock.
//!
//! The current game is stored by folder name and resolved against the
//! registry whenever it is read, so a reload can never leave it pointing at
//! a removed entry. Callers get an [`Arc`] handle to the entry, which stays
//! usable after a later reload drops the entry from the registry.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{self, GameConfigSource, Settings};
use crate::error::SessionError;
use crate::game::{GameEntry, GameHandle, GameProbe};
use crate::logging::LogControl;
use crate::registry::{GameRegistry, ReconcileReport};
use crate::selector::{self, SelectionPreferences};

pub struct SessionState {
    data_dir: PathBuf,
    probe: Box<dyn GameProbe>,
    log_control: Option<LogControl>,
    /// Only written through `&mut self` during startup.
    init_errors: Vec<String>,
    inner: Mutex<Inner>,
}

struct Inner {
    settings: Settings,
    registry: GameRegistry,
    /// Folder name of the current game.
    current: Option<String>,
    unapplied_changes: u32,
}

impl Inner {
    fn current_entry(&self) -> Option<&GameHandle> {
        self.current
            .as_deref()
            .and_then(|folder| self.registry.find(folder))
    }

    fn select(&mut self, preferred: &str) -> Result<GameHandle, SessionError> {
        let prefs = SelectionPreferences {
            preferred,
            configured_default: &self.settings.game,
            last_used: &self.settings.last_game,
        };
        let selected = selector::select(&prefs, &self.registry);
        self.current = selected
            .as_ref()
            .ok()
            .map(|entry| entry.folder_name().to_string());
        selected
    }

    /// Writes install paths found by the probe back into the settings so
    /// they are persisted on save.
    fn store_resolved_paths(&mut self, report: &ReconcileReport) {
        if report.resolved_paths.is_empty() {
            return;
        }
        let mut games = self.settings.game_settings().to_vec();
        let mut changed = false;
        for (folder, path) in &report.resolved_paths {
            match games.iter_mut().find(|g| g.matches(folder)) {
                Some(game) if game.path != *path => {
                    game.path = path.clone();
                    changed = true;
                }
                Some(_) => {}
                None => tracing::error!("Could not find the settings for the game ({folder})"),
            }
        }
        if changed {
            self.settings.store_game_settings(games);
        }
    }
}

impl SessionState {
    pub fn new(data_dir: PathBuf, probe: Box<dyn GameProbe>) -> Self {
        Self {
            data_dir,
            probe,
            log_control: None,
            init_errors: Vec::new(),
            inner: Mutex::new(Inner {
                settings: Settings::default(),
                registry: GameRegistry::default(),
                current: None,
                unapplied_changes: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Startup ───────────────────────────────────────────────────────────────

    pub fn record_init_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.init_errors.push(message);
    }

    /// Logs every init error again. Errors recorded before the log
    /// subscriber was installed are otherwise lost.
    pub fn log_init_errors(&self) {
        for message in &self.init_errors {
            tracing::error!("{message}");
        }
    }

    pub fn set_log_control(&mut self, control: LogControl) {
        self.log_control = Some(control);
    }

    /// Creates the data directory and reads the settings file. Failures are
    /// recorded as init errors and default settings are returned.
    pub fn read_settings_file(&mut self, path: &Path) -> Settings {
        if !self.data_dir.exists() {
            tracing::info!("Data directory doesn't exist, creating it.");
            if let Err(e) = std::fs::create_dir_all(&self.data_dir) {
                self.record_init_error(format!("Error: Could not create data directory. {e}"));
            }
        }
        match config::load_or_default(path) {
            Ok(settings) => settings,
            Err(e) => {
                self.record_init_error(format!("Error: Settings parsing failed. {e:#}"));
                Settings::default()
            }
        }
    }

    /// Detects installed games from scratch and selects the startup game,
    /// preferring `cmd_line_game` when given.
    pub fn init(&mut self, settings: Settings, cmd_line_game: Option<&str>) {
        if let Some(log) = &self.log_control {
            log.set_debug(settings.enable_debug_logging);
        }

        tracing::debug!("Detecting installed games.");
        let (registry, report) = GameRegistry::detect(settings.game_settings(), self.probe.as_ref());

        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        inner.settings = settings;
        inner.registry = registry;
        inner.current = None;
        inner.store_resolved_paths(&report);

        tracing::debug!("Selecting game.");
        let result = inner.select(cmd_line_game.unwrap_or("")).and_then(|entry| {
            tracing::debug!("Game selected is {}", entry.name());
            tracing::debug!("Initialising game-specific settings.");
            entry.init(&self.data_dir).map(|_| ()).map_err(|source| SessionError::GameInit {
                folder: entry.folder_name().to_string(),
                source,
            })
        });

        if let Err(e) = result {
            let message = match e {
                SessionError::GameInit { source, .. } => format!("{source:#}"),
                other => other.to_string(),
            };
            self.record_init_error(format!(
                "Error: Game-specific settings could not be initialised. {message}"
            ));
        }
    }

    pub fn init_errors(&self) -> &[String] {
        &self.init_errors
    }

    // ── Reload ────────────────────────────────────────────────────────────────

    /// Applies freshly read settings.
    ///
    /// Existing games are updated in place, newly installed ones are added
    /// and games missing from `settings` are dropped. The current game is
    /// reselected only if it was dropped (or none was selected), then
    /// re-initialised in case its install path changed.
    pub fn load(&self, settings: Settings) -> Result<(), SessionError> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        if let Some(log) = &self.log_control {
            log.set_debug(settings.enable_debug_logging);
        }
        inner.settings = settings;

        let report = inner
            .registry
            .reconcile(inner.settings.game_settings(), self.probe.as_ref());
        inner.store_resolved_paths(&report);
        if !report.is_empty() {
            tracing::info!(
                "[session] Games reloaded: {} added, {} updated, {} removed",
                report.added.len(),
                report.updated.len(),
                report.removed.len()
            );
        }

        if inner.current_entry().is_none() {
            if let Some(folder) = &inner.current {
                tracing::debug!("Current game {folder} is no longer installed, reselecting");
            }
            inner.select("")?;
        }

        if let Some(entry) = inner.current_entry() {
            // The install path may have changed.
            entry.init(&self.data_dir).map_err(|source| SessionError::GameInit {
                folder: entry.folder_name().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    // ── Current game ──────────────────────────────────────────────────────────

    /// Makes the game with folder name `folder` (any case) current.
    ///
    /// The selection changes even if initialising the game then fails.
    pub fn change_current_game(&self, folder: &str) -> Result<(), SessionError> {
        let mut inner = self.lock();

        tracing::debug!("Changing current game to that with folder: {folder}");
        let entry = inner
            .registry
            .find(folder)
            .cloned()
            .ok_or_else(|| SessionError::GameNotFound(folder.to_string()))?;
        inner.current = Some(entry.folder_name().to_string());

        entry
            .init(&self.data_dir)
            .map_err(|source| SessionError::GameInit {
                folder: entry.folder_name().to_string(),
                source,
            })?;
        tracing::debug!("New game is {}", entry.name());
        Ok(())
    }

    /// Returns a handle to the current game. The handle remains valid even
    /// if a later reload removes the game from the registry.
    pub fn current_game(&self) -> Result<GameHandle, SessionError> {
        self.lock()
            .current_entry()
            .cloned()
            .ok_or(SessionError::NoGameSelected)
    }

    /// Runs `f` on the current game while the session lock is held, so no
    /// reload can interleave with it.
    pub fn with_current_game<R>(&self, f: impl FnOnce(&GameEntry) -> R) -> Result<R, SessionError> {
        let inner = self.lock();
        let entry = inner.current_entry().ok_or(SessionError::NoGameSelected)?;
        Ok(f(entry.as_ref()))
    }

    /// Folder names of the detected games, in registry order.
    pub fn installed_games(&self) -> Vec<String> {
        self.lock().registry.folder_names()
    }

    // ── Unapplied changes ─────────────────────────────────────────────────────

    pub fn has_unapplied_changes(&self) -> bool {
        self.lock().unapplied_changes > 0
    }

    pub fn increment_unapplied_change_counter(&self) {
        let mut inner = self.lock();
        inner.unapplied_changes = inner.unapplied_changes.saturating_add(1);
    }

    pub fn decrement_unapplied_change_counter(&self) {
        let mut inner = self.lock();
        inner.unapplied_changes = inner.unapplied_changes.saturating_sub(1);
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Snapshot of the active settings.
    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    /// Records the current game as the last one used and writes the
    /// settings to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        if let Some(folder) = inner.current_entry().map(|e| e.folder_name().to_string()) {
            inner.settings.last_game = folder;
        }
        inner.settings.last_version = env!("CARGO_PKG_VERSION").to_string();
        inner.settings.save(path)
    }
}
