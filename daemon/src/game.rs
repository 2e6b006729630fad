use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Name of the directory under a game's install path that holds its plugins.
pub const DATA_DIR_NAME: &str = "Data";

/// The family a supported game belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Tes4,
    Tes5,
    Tes5se,
    Fo3,
    Fonv,
    Fo4,
}

/// One configured game, as read from the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Stable identity of the game. Compared case-insensitively.
    pub folder_name: String,
    pub name: String,
    #[serde(rename = "type")]
    pub game_type: GameType,
    /// Filename of the game's main master plugin (e.g. "Skyrim.esm").
    pub master: String,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default)]
    pub repo_branch: String,
    /// Install path. Empty when not yet known.
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default)]
    pub registry_key: String,
}

impl GameSettings {
    fn stock(
        game_type: GameType,
        folder_name: &str,
        name: &str,
        master: &str,
        repo: &str,
        registry_key: &str,
    ) -> Self {
        Self {
            folder_name: folder_name.to_string(),
            name: name.to_string(),
            game_type,
            master: master.to_string(),
            repo_url: format!("https://github.com/loot/{repo}.git"),
            repo_branch: "v0.10".to_string(),
            path: PathBuf::new(),
            registry_key: registry_key.to_string(),
        }
    }

    /// The games known out of the box, in their default display order.
    pub fn defaults() -> Vec<GameSettings> {
        vec![
            Self::stock(
                GameType::Tes4,
                "Oblivion",
                "TES IV: Oblivion",
                "Oblivion.esm",
                "oblivion",
                r"Software\Bethesda Softworks\Oblivion\Installed Path",
            ),
            Self::stock(
                GameType::Tes5,
                "Skyrim",
                "TES V: Skyrim",
                "Skyrim.esm",
                "skyrim",
                r"Software\Bethesda Softworks\Skyrim\Installed Path",
            ),
            Self::stock(
                GameType::Tes5se,
                "Skyrim Special Edition",
                "TES V: Skyrim Special Edition",
                "Skyrim.esm",
                "skyrimse",
                r"Software\Bethesda Softworks\Skyrim Special Edition\Installed Path",
            ),
            Self::stock(
                GameType::Fo3,
                "Fallout3",
                "Fallout 3",
                "Fallout3.esm",
                "fallout3",
                r"Software\Bethesda Softworks\Fallout3\Installed Path",
            ),
            Self::stock(
                GameType::Fonv,
                "FalloutNV",
                "Fallout: New Vegas",
                "FalloutNV.esm",
                "falloutnv",
                r"Software\Bethesda Softworks\FalloutNV\Installed Path",
            ),
            Self::stock(
                GameType::Fo4,
                "Fallout4",
                "Fallout 4",
                "Fallout4.esm",
                "fallout4",
                r"Software\Bethesda Softworks\Fallout4\Installed Path",
            ),
        ]
    }

    pub fn matches(&self, folder_name: &str) -> bool {
        self.folder_name.eq_ignore_ascii_case(folder_name)
    }
}

/// Answers whether a configured game is installed on this machine.
pub trait GameProbe: Send + Sync {
    /// Returns the resolved install path, or `None` if the game is not installed.
    fn locate(&self, settings: &GameSettings) -> Result<Option<PathBuf>>;

    fn is_installed(&self, settings: &GameSettings) -> bool {
        matches!(self.locate(settings), Ok(Some(_)))
    }
}

/// Treats a game as installed when its master plugin exists under the
/// configured install path.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl GameProbe for FsProbe {
    fn locate(&self, settings: &GameSettings) -> Result<Option<PathBuf>> {
        if settings.path.as_os_str().is_empty() {
            return Ok(None);
        }
        let master = settings.path.join(DATA_DIR_NAME).join(&settings.master);
        let found = master
            .try_exists()
            .with_context(|| format!("Failed to check for {}", master.display()))?;
        Ok(found.then(|| settings.path.clone()))
    }
}

/// Mutable part of a [`GameEntry`], overwritten in place on reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDetails {
    pub name: String,
    pub game_type: GameType,
    pub master: String,
    pub repo_url: String,
    pub repo_branch: String,
    pub path: PathBuf,
    pub registry_key: String,
}

impl From<&GameSettings> for GameDetails {
    fn from(s: &GameSettings) -> Self {
        Self {
            name: s.name.clone(),
            game_type: s.game_type,
            master: s.master.clone(),
            repo_url: s.repo_url.clone(),
            repo_branch: s.repo_branch.clone(),
            path: s.path.clone(),
            registry_key: s.registry_key.clone(),
        }
    }
}

/// A detected, installed game.
///
/// The folder name is fixed at construction. Everything else sits behind a
/// lock so a reload can update the entry while handles to it are held
/// elsewhere.
#[derive(Debug)]
pub struct GameEntry {
    folder_name: String,
    details: RwLock<GameDetails>,
}

/// Shared handle to a [`GameEntry`]. Stays valid after the entry is dropped
/// from the registry.
pub type GameHandle = Arc<GameEntry>;

impl GameEntry {
    /// Builds an entry for a detected game, using `path` as its install path.
    pub fn new(settings: &GameSettings, path: PathBuf) -> Self {
        let mut details = GameDetails::from(settings);
        details.path = path;
        Self {
            folder_name: settings.folder_name.clone(),
            details: RwLock::new(details),
        }
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    pub fn matches(&self, folder_name: &str) -> bool {
        self.folder_name.eq_ignore_ascii_case(folder_name)
    }

    /// Returns a copy of the mutable fields.
    pub fn details(&self) -> GameDetails {
        self.details
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn name(&self) -> String {
        self.details
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .name
            .clone()
    }

    pub fn path(&self) -> PathBuf {
        self.details
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .path
            .clone()
    }

    /// Overwrites the mutable fields from `settings`. An empty configured
    /// path keeps the current one. Returns whether anything changed.
    pub fn update(&self, settings: &GameSettings) -> bool {
        let mut new = GameDetails::from(settings);
        let mut details = self.details.write().unwrap_or_else(PoisonError::into_inner);
        if new.path.as_os_str().is_empty() {
            new.path = details.path.clone();
        }
        if *details == new {
            return false;
        }
        *details = new;
        true
    }

    /// Prepares the game's working paths: checks the install path and
    /// creates `<data_dir>/<folder_name>`. Returns the per-game data dir.
    pub fn init(&self, data_dir: &Path) -> Result<PathBuf> {
        let path = self.path();
        if !path.is_dir() {
            bail!("Install path \"{}\" is not a directory", path.display());
        }
        let game_data_dir = data_dir.join(&self.folder_name);
        std::fs::create_dir_all(&game_data_dir)
            .with_context(|| format!("Failed to create {}", game_data_dir.display()))?;
        Ok(game_data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(folder: &str, path: &Path) -> GameSettings {
        GameSettings {
            folder_name: folder.to_string(),
            name: format!("{folder} name"),
            game_type: GameType::Tes5,
            master: "Skyrim.esm".to_string(),
            repo_url: String::new(),
            repo_branch: String::new(),
            path: path.to_path_buf(),
            registry_key: String::new(),
        }
    }

    fn install(root: &Path, master: &str) {
        let data = root.join(DATA_DIR_NAME);
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join(master), b"").unwrap();
    }

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn defaults_have_unique_folder_names() {
        let games = GameSettings::defaults();
        for (i, a) in games.iter().enumerate() {
            for b in &games[i + 1..] {
                assert!(!a.matches(&b.folder_name), "{} duplicated", a.folder_name);
            }
        }
    }

    #[test]
    fn defaults_have_no_path() {
        assert!(GameSettings::defaults()
            .iter()
            .all(|g| g.path.as_os_str().is_empty()));
    }

    // ── FsProbe ───────────────────────────────────────────────────────────────

    #[test]
    fn probe_finds_master_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "Skyrim.esm");
        let s = settings("Skyrim", dir.path());
        assert_eq!(FsProbe.locate(&s).unwrap(), Some(dir.path().to_path_buf()));
        assert!(FsProbe.is_installed(&s));
    }

    #[test]
    fn probe_rejects_missing_master() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "Oblivion.esm");
        assert!(!FsProbe.is_installed(&settings("Skyrim", dir.path())));
    }

    #[test]
    fn probe_rejects_empty_path() {
        assert_eq!(FsProbe.locate(&settings("Skyrim", Path::new(""))).unwrap(), None);
    }

    // ── GameEntry ─────────────────────────────────────────────────────────────

    #[test]
    fn entry_matches_case_insensitively() {
        let entry = GameEntry::new(&settings("Skyrim", Path::new("/games/skyrim")), PathBuf::new());
        assert!(entry.matches("skyrim"));
        assert!(entry.matches("SKYRIM"));
        assert!(!entry.matches("Skyrim Special Edition"));
    }

    #[test]
    fn entry_uses_resolved_path() {
        let entry = GameEntry::new(
            &settings("Skyrim", Path::new("")),
            PathBuf::from("/resolved/skyrim"),
        );
        assert_eq!(entry.path(), PathBuf::from("/resolved/skyrim"));
    }

    #[test]
    fn update_overwrites_fields_but_not_identity() {
        let entry = GameEntry::new(&settings("Skyrim", Path::new("/a")), PathBuf::from("/a"));
        let mut changed = settings("skyrim", Path::new("/b"));
        changed.name = "Renamed".to_string();
        changed.repo_branch = "dev".to_string();

        assert!(entry.update(&changed));
        assert_eq!(entry.folder_name(), "Skyrim");
        let d = entry.details();
        assert_eq!(d.name, "Renamed");
        assert_eq!(d.repo_branch, "dev");
        assert_eq!(d.path, PathBuf::from("/b"));
    }

    #[test]
    fn update_with_empty_path_keeps_resolved_path() {
        let entry = GameEntry::new(&settings("Skyrim", Path::new("")), PathBuf::from("/found"));
        entry.update(&settings("Skyrim", Path::new("")));
        assert_eq!(entry.path(), PathBuf::from("/found"));
    }

    #[test]
    fn update_with_same_settings_reports_no_change() {
        let s = settings("Skyrim", Path::new("/a"));
        let entry = GameEntry::new(&s, s.path.clone());
        assert!(!entry.update(&s));
    }

    #[test]
    fn init_creates_game_data_dir() {
        let install_dir = tempfile::tempdir().unwrap();
        let data_dir = tempfile::tempdir().unwrap();
        let s = settings("Skyrim", install_dir.path());
        let entry = GameEntry::new(&s, s.path.clone());

        let game_dir = entry.init(data_dir.path()).unwrap();
        assert_eq!(game_dir, data_dir.path().join("Skyrim"));
        assert!(game_dir.is_dir());
    }

    #[test]
    fn init_fails_when_install_path_is_gone() {
        let data_dir = tempfile::tempdir().unwrap();
        let s = settings("Skyrim", &data_dir.path().join("missing"));
        let entry = GameEntry::new(&s, s.path.clone());
        assert!(entry.init(data_dir.path()).is_err());
    }
}
