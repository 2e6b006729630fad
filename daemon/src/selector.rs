use std::sync::Arc;

use crate::error::SessionError;
use crate::game::GameHandle;
use crate::registry::GameRegistry;

/// Sentinel meaning "no particular game" for the configured default and
/// last-used game.
pub const AUTO: &str = "auto";

/// Inputs to [`select`], in decreasing priority.
#[derive(Debug, Clone, Default)]
pub struct SelectionPreferences<'a> {
    /// Runtime override, e.g. from the command line. Ignored when empty.
    pub preferred: &'a str,
    /// Game configured as the default. Ignored when [`AUTO`].
    pub configured_default: &'a str,
    /// Game used in the previous session. Ignored when [`AUTO`].
    pub last_used: &'a str,
}

/// Picks the game to make current.
///
/// The first of `preferred`, `configured_default` and `last_used` that names
/// an installed game wins; otherwise the first registry entry is used. Fails
/// only if the registry is empty.
pub fn select(
    prefs: &SelectionPreferences<'_>,
    registry: &GameRegistry,
) -> Result<GameHandle, SessionError> {
    let candidates = [
        Some(prefs.preferred).filter(|p| !p.is_empty()),
        Some(prefs.configured_default).filter(|p| !p.is_empty() && *p != AUTO),
        Some(prefs.last_used).filter(|p| !p.is_empty() && *p != AUTO),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Some(entry) = registry.find(candidate) {
            return Ok(Arc::clone(entry));
        }
        tracing::debug!("Preferred game \"{candidate}\" is not installed");
    }

    registry
        .first()
        .map(Arc::clone)
        .ok_or(SessionError::NoGameDetected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::{game, FakeProbe};

    fn registry(folders: &[&str]) -> GameRegistry {
        let probe = FakeProbe::new(folders);
        let configured: Vec<_> = folders.iter().map(|f| game(f)).collect();
        GameRegistry::detect(&configured, &probe).0
    }

    fn pick(prefs: SelectionPreferences<'_>, registry: &GameRegistry) -> String {
        select(&prefs, registry).unwrap().folder_name().to_string()
    }

    #[test]
    fn last_used_wins_when_default_is_auto() {
        let r = registry(&["A", "B", "C"]);
        let prefs = SelectionPreferences {
            preferred: "",
            configured_default: AUTO,
            last_used: "B",
        };
        assert_eq!(pick(prefs, &r), "B");
    }

    #[test]
    fn preferred_beats_default_and_last_used() {
        let r = registry(&["A", "B", "C"]);
        let prefs = SelectionPreferences {
            preferred: "C",
            configured_default: "A",
            last_used: "B",
        };
        assert_eq!(pick(prefs, &r), "C");
    }

    #[test]
    fn configured_default_beats_last_used() {
        let r = registry(&["A", "B", "C"]);
        let prefs = SelectionPreferences {
            preferred: "",
            configured_default: "C",
            last_used: "B",
        };
        assert_eq!(pick(prefs, &r), "C");
    }

    #[test]
    fn uninstalled_preferences_fall_through() {
        let r = registry(&["A", "B", "C"]);
        let prefs = SelectionPreferences {
            preferred: "Z",
            configured_default: "Y",
            last_used: "B",
        };
        assert_eq!(pick(prefs, &r), "B");
    }

    #[test]
    fn falls_back_to_first_entry() {
        let r = registry(&["A", "B"]);
        let prefs = SelectionPreferences {
            preferred: "",
            configured_default: AUTO,
            last_used: AUTO,
        };
        assert_eq!(pick(prefs, &r), "A");
    }

    #[test]
    fn matching_ignores_case() {
        let r = registry(&["Skyrim", "Oblivion"]);
        let prefs = SelectionPreferences {
            preferred: "oblivion",
            ..Default::default()
        };
        assert_eq!(pick(prefs, &r), "Oblivion");
    }

    #[test]
    fn empty_registry_is_no_game_detected() {
        let r = GameRegistry::default();
        let prefs = SelectionPreferences {
            preferred: "A",
            ..Default::default()
        };
        assert!(matches!(select(&prefs, &r), Err(SessionError::NoGameDetected)));
    }
}
