use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::game::{GameEntry, GameHandle, GameProbe, GameSettings};

/// What a single [`GameRegistry::reconcile`] pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Folder names of newly detected games, in configuration order.
    pub added: Vec<String>,
    /// Folder names of existing entries whose fields changed.
    pub updated: Vec<String>,
    /// Folder names of entries dropped because they left the configuration.
    pub removed: Vec<String>,
    /// Install path of each added game, and of each kept game whose
    /// configured path is empty, so it can be written back to the settings.
    pub resolved_paths: Vec<(String, PathBuf)>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Ordered set of detected games. Folder names are unique, ignoring case.
#[derive(Debug, Default)]
pub struct GameRegistry {
    entries: Vec<GameHandle>,
}

impl GameRegistry {
    /// Detects installed games from scratch.
    pub fn detect(configured: &[GameSettings], probe: &dyn GameProbe) -> (Self, ReconcileReport) {
        let mut registry = Self::default();
        let report = registry.reconcile(configured, probe);
        (registry, report)
    }

    /// Merges `configured` into the registry.
    ///
    /// Matching entries are updated in place and keep their position, so
    /// outstanding handles observe the new fields. Unmatched games are probed
    /// and appended if installed. Entries whose folder name no longer appears
    /// in `configured` are removed afterwards in one pass.
    pub fn reconcile(
        &mut self,
        configured: &[GameSettings],
        probe: &dyn GameProbe,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(configured.len());

        tracing::trace!("Updating existing games and adding new games.");
        for settings in configured {
            if let Some(entry) = self.find(&settings.folder_name) {
                if entry.update(settings) {
                    tracing::trace!("Updated game entry for: {}", entry.folder_name());
                    report.updated.push(entry.folder_name().to_string());
                }
                if settings.path.as_os_str().is_empty() {
                    report
                        .resolved_paths
                        .push((settings.folder_name.clone(), entry.path()));
                }
            } else {
                match probe.locate(settings) {
                    Ok(Some(path)) => {
                        tracing::trace!(
                            "Adding new installed game entry for: {}",
                            settings.folder_name
                        );
                        self.entries.push(Arc::new(GameEntry::new(settings, path.clone())));
                        report.added.push(settings.folder_name.clone());
                        report.resolved_paths.push((settings.folder_name.clone(), path));
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(
                        "[registry] Treating {} as not installed: {e:#}",
                        settings.folder_name
                    ),
                }
            }
            seen.insert(settings.folder_name.to_ascii_lowercase());
        }

        tracing::trace!("Removing deleted games.");
        self.entries.retain(|entry| {
            let keep = seen.contains(&entry.folder_name().to_ascii_lowercase());
            if !keep {
                tracing::trace!("Removing game: {}", entry.folder_name());
                report.removed.push(entry.folder_name().to_string());
            }
            keep
        });

        report
    }

    pub fn find(&self, folder_name: &str) -> Option<&GameHandle> {
        self.entries.iter().find(|e| e.matches(folder_name))
    }

    pub fn contains(&self, folder_name: &str) -> bool {
        self.find(folder_name).is_some()
    }

    pub fn first(&self) -> Option<&GameHandle> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn folder_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.folder_name().to_string())
            .collect()
    }
}
