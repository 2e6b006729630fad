use crate::config::Settings;

pub enum SessionEvent {
    /// The settings file changed on disk and was successfully re-parsed.
    ConfigReloaded(Settings),
    /// Ctrl+C received; the daemon should save settings and exit.
    Shutdown,
}
