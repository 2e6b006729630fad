/// Errors surfaced by the session state to its callers.
///
/// Startup-time failures are not represented here: they are collected as
/// strings in the session's init error log so the daemon can still start.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The registry is empty, so no game can be selected.
    #[error("None of the supported games were detected.")]
    NoGameDetected,

    /// A selection change named a game that is not in the registry.
    #[error("No installed game has the folder name \"{0}\"")]
    GameNotFound(String),

    /// The current game was requested before any selection succeeded.
    #[error("No game is currently selected")]
    NoGameSelected,

    /// The game became current but its per-game setup failed.
    #[error("Game-specific settings for \"{folder}\" could not be initialised: {source:#}")]
    GameInit {
        folder: String,
        source: anyhow::Error,
    },
}
