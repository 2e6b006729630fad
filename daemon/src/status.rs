use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::session::SessionState;

/// Snapshot of the session written by the daemon to status.toml.
/// Frontends read this file (read-only) to display session state.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    /// Folder name of the current game, if one is selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_game: Option<String>,
    /// Folder names of all detected games, in registry order.
    pub installed_games: Vec<String>,
    pub has_unapplied_changes: bool,
    /// Problems hit during startup, oldest first.
    pub init_errors: Vec<String>,
    /// Most recent non-fatal error after startup, e.g. a failed reload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 timestamp of when this snapshot was taken.
    pub updated_at: String,
}

impl SessionStatus {
    /// Captures the current state of `session`.
    pub fn capture(session: &SessionState, error: Option<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            current_game: session
                .current_game()
                .ok()
                .map(|game| game.folder_name().to_string()),
            installed_games: session.installed_games(),
            has_unapplied_changes: session.has_unapplied_changes(),
            init_errors: session.init_errors().to_vec(),
            error,
            updated_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Status write failures are logged, not returned.
pub fn write_status(path: &Path, status: &SessionStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("[status] Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                tracing::warn!("[status] Failed to write status file: {e}");
            }
        }
        Err(e) => tracing::warn!("[status] Failed to serialize status: {e}"),
    }
}
