//! The operations exposed to front ends, composed over one configuration.
//!
//! [`SaveEditor`] owns the scan cache and the change hub; nothing in the
//! library keeps process-wide state.

use crate::backup::{self, BackupEntry};
use crate::config::EditorConfig;
use crate::error::SaveError;
use crate::globals::{GlobalSettingsPatch, GlobalSettingsView};
use crate::model::{self, Patch, Snapshot, WriteOutcome};
use crate::scan::{self, group_saves, SaveFile, SaveGroup, ScanCache, ScanIssue};
use crate::store;
use crate::watch::{ChangeHub, SaveWatcher, Subscription};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub struct SaveEditor {
    config: EditorConfig,
    cache: Arc<ScanCache>,
    hub: ChangeHub,
    watcher: Mutex<Option<SaveWatcher>>,
}

impl SaveEditor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            cache: Arc::new(ScanCache::new()),
            hub: ChangeHub::new(),
            watcher: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Configured directories, memoized until a change invalidates it.
    pub fn scan(&self) -> Arc<Vec<SaveFile>> {
        self.cache
            .get_or_compute(|| scan::scan(&self.config.directories, &self.config.scan_options()))
    }

    pub fn scan_with_issues(&self, dirs: &[PathBuf]) -> (Vec<SaveFile>, Vec<ScanIssue>) {
        scan::scan_with_issues(dirs, &self.config.scan_options())
    }

    pub fn groups(&self) -> Vec<SaveGroup> {
        group_saves(&self.scan())
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn read_snapshot(&self, path: &Path) -> Snapshot {
        model::read_snapshot(path)
    }

    pub fn write_snapshot(&self, path: &Path, patch: &Patch) -> Result<WriteOutcome, SaveError> {
        let result = model::write_snapshot(path, patch, &self.config.backup_policy());
        self.cache.invalidate();
        result
    }

    /// Remove a save. No implicit backup; call [`SaveEditor::backup`] first
    /// to keep one.
    pub fn delete_save(&self, path: &Path) -> Result<(), SaveError> {
        let result = store::delete_file(path);
        self.cache.invalidate();
        result
    }

    pub fn backup(&self, path: &Path) -> Result<PathBuf, SaveError> {
        backup::backup_save(path, &self.config.backup_policy())
    }

    pub fn list_backups(&self, path: &Path) -> Vec<BackupEntry> {
        backup::list_backups(path, &self.config.backup_policy())
    }

    pub fn restore_backup(&self, path: &Path, backup_path: &Path) -> Result<(), SaveError> {
        let result = backup::restore_backup(path, backup_path);
        self.cache.invalidate();
        result
    }

    pub fn read_global_settings(&self, dir: &Path) -> GlobalSettingsView {
        self.config.globals_store().read(dir)
    }

    pub fn write_global_settings(
        &self,
        dir: &Path,
        patch: &GlobalSettingsPatch,
        create_if_missing: bool,
    ) -> Result<WriteOutcome, SaveError> {
        self.config
            .globals_store()
            .write(dir, patch, create_if_missing)
    }

    pub fn delete_global_settings(&self, dir: &Path) -> Result<WriteOutcome, SaveError> {
        self.config.globals_store().delete(dir)
    }

    /// Called once per debounced burst of file changes.
    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.hub.subscribe(listener)
    }

    /// Start watching the configured directories, or re-sync the watched
    /// set with them. Returns how many directories are watched.
    pub fn watch(&self) -> usize {
        let mut slot = match self.watcher.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        let watcher = slot.get_or_insert_with(|| {
            SaveWatcher::new(
                self.config.scan_options(),
                self.config.debounce(),
                Arc::clone(&self.cache),
                self.hub.clone(),
            )
        });
        watcher.ensure(&self.config.directories)
    }

    pub fn unwatch(&self) {
        if let Ok(mut slot) = self.watcher.lock() {
            slot.take();
        }
    }
}
