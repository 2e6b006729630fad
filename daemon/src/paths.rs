/// Canonical file paths for Warden data files.
///
/// Everything lives under one data directory:
///   - settings.toml  Written by the user or a frontend, read by the daemon.
///   - status.toml    Written by the daemon, read by frontends.
///   - warden.log     Daemon log.
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "Warden";
const APP_DIR_NAME_UNIX: &str = "warden";
/// Overrides the data directory when set.
pub const DATA_DIR_ENV: &str = "WARDEN_DATA_DIR";
pub const SETTINGS_FILE_NAME: &str = "settings.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";
pub const LOG_FILE_NAME: &str = "warden.log";

/// Returns the Warden data directory.
///
/// Resolution order: `$WARDEN_DATA_DIR`, `%APPDATA%\Warden`,
/// `$XDG_DATA_HOME/warden`, `$HOME/.local/share/warden`.
pub fn app_data_dir() -> Result<PathBuf> {
    resolve_data_dir(|name| std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from))
}

fn resolve_data_dir(var: impl Fn(&str) -> Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = var(DATA_DIR_ENV) {
        return Ok(dir);
    }
    if let Some(appdata) = var("APPDATA") {
        return Ok(appdata.join(APP_DIR_NAME));
    }
    if let Some(xdg) = var("XDG_DATA_HOME") {
        return Ok(xdg.join(APP_DIR_NAME_UNIX));
    }
    if let Some(home) = var("HOME") {
        return Ok(home.join(".local").join("share").join(APP_DIR_NAME_UNIX));
    }
    bail!("Could not resolve a data directory: set {DATA_DIR_ENV}")
}

pub fn settings_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE_NAME)
}

pub fn status_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STATUS_FILE_NAME)
}

pub fn log_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<PathBuf> {
        let map: HashMap<String, PathBuf> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), PathBuf::from(v)))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn override_wins() {
        let dir = resolve_data_dir(env(&[(DATA_DIR_ENV, "/custom"), ("APPDATA", "/appdata")])).unwrap();
        assert_eq!(dir, PathBuf::from("/custom"));
    }

    #[test]
    fn appdata_is_used_before_xdg() {
        let dir = resolve_data_dir(env(&[("APPDATA", "/appdata"), ("XDG_DATA_HOME", "/xdg")])).unwrap();
        assert_eq!(dir, Path::new("/appdata").join(APP_DIR_NAME));
    }

    #[test]
    fn xdg_data_home_is_used_before_home() {
        let dir = resolve_data_dir(env(&[("XDG_DATA_HOME", "/xdg"), ("HOME", "/home/me")])).unwrap();
        assert_eq!(dir, PathBuf::from("/xdg/warden"));
    }

    #[test]
    fn falls_back_to_home() {
        let dir = resolve_data_dir(env(&[("HOME", "/home/me")])).unwrap();
        assert_eq!(dir, PathBuf::from("/home/me/.local/share/warden"));
    }

    #[test]
    fn no_variables_is_an_error() {
        assert!(resolve_data_dir(env(&[])).is_err());
    }

    #[test]
    fn files_share_the_data_dir() {
        let dir = Path::new("/data");
        assert_eq!(settings_file_path(dir).parent(), Some(dir));
        assert_eq!(status_file_path(dir).parent(), Some(dir));
        assert_eq!(log_file_path(dir).file_name().unwrap(), LOG_FILE_NAME);
    }
}
