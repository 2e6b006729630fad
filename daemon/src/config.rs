use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::event::SessionEvent;
use crate::game::GameSettings;
use crate::selector::AUTO;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Supplies the configured games and accepts updates to them.
pub trait GameConfigSource {
    fn game_settings(&self) -> &[GameSettings];
    fn store_game_settings(&mut self, games: Vec<GameSettings>);
}

/// Root settings structure. Deserialized from the data dir's settings.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Game to select on startup, or "auto".
    #[serde(default = "default_auto")]
    pub game: String,
    /// Game that was current when the settings were last saved, or "auto".
    #[serde(default = "default_auto")]
    pub last_game: String,
    /// Version of the daemon that last saved the settings.
    #[serde(default)]
    pub last_version: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Log at trace level instead of warn.
    #[serde(default)]
    pub enable_debug_logging: bool,
    #[serde(default = "GameSettings::defaults")]
    pub games: Vec<GameSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            game: default_auto(),
            last_game: default_auto(),
            last_version: String::new(),
            language: default_language(),
            enable_debug_logging: false,
            games: GameSettings::defaults(),
        }
    }
}

impl GameConfigSource for Settings {
    fn game_settings(&self) -> &[GameSettings] {
        &self.games
    }

    fn store_game_settings(&mut self, games: Vec<GameSettings>) {
        self.games = games;
    }
}

impl Settings {
    /// Writes the settings to `path` as TOML, creating the parent directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file: {}", path.display()))
    }
}

/// Loads the settings file at `path`, returning `Settings::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Settings parsing failed: {}", path.display()))
}

/// Whether `event` is a create or modify of the settings file at `path`.
fn is_settings_write(event: &notify::Event, path: &Path) -> bool {
    matches!(
        event.kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_)
    ) && event.paths.iter().any(|p| p == path)
}

/// Watches the directory holding the settings file and sends a
/// `ConfigReloaded` event each time the file is written and parses.
/// Unparsable writes are logged and skipped. Returns once the receiver
/// is gone or the watcher cannot be set up.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<SessionEvent>) {
    let Some(watch_dir) = path.parent().map(Path::to_path_buf) else {
        tracing::error!("[config] Settings path has no parent directory");
        return;
    };

    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);
    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    )
    .and_then(|mut watcher| {
        // Editors often save by writing a new file and renaming it over the old one.
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    });
    // Dropping the watcher stops it, so keep it bound for the loop below.
    let _watcher = match watcher {
        Ok(w) => w,
        Err(e) => {
            tracing::error!("[config] Failed to watch {}: {e}", watch_dir.display());
            return;
        }
    };

    while let Some(event) = watch_rx.recv().await {
        if !is_settings_write(&event, &path) {
            continue;
        }
        let settings = match load_or_default(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("[config] Ignoring settings change: {e:#}");
                continue;
            }
        };
        tracing::debug!("[config] Settings file changed");
        if tx.send(SessionEvent::ConfigReloaded(settings)).await.is_err() {
            break;
        }
    }
}

fn default_auto() -> String {
    AUTO.to_string()
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}
