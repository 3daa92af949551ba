use crate::backup::BackupPolicy;
use crate::globals::{GlobalSettingsStore, GLOBAL_SETTINGS_FILE};
use crate::scan::ScanOptions;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

fn default_extensions() -> Vec<String> {
    vec!["es3".to_string()]
}

fn default_backup_dir_name() -> String {
    ".backups".to_string()
}

fn default_keep_backups() -> usize {
    20
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_global_settings_file() -> String {
    GLOBAL_SETTINGS_FILE.to_string()
}

/// Editor settings. Every field has a default, so an empty document is a
/// valid configuration.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EditorConfig {
    /// Save directories to scan and watch
    #[serde(default)]
    pub directories: Vec<PathBuf>,
    /// Save file extensions, without the dot; matched case-insensitively
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_backup_dir_name")]
    pub backup_dir_name: String,
    #[serde(default = "default_keep_backups")]
    pub keep_backups: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_global_settings_file")]
    pub global_settings_file: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            extensions: default_extensions(),
            backup_dir_name: default_backup_dir_name(),
            keep_backups: default_keep_backups(),
            debounce_ms: default_debounce_ms(),
            global_settings_file: default_global_settings_file(),
        }
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && name != "." && name != ".."
}

impl EditorConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.extensions.is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "extensions",
            });
        }
        for ext in &self.extensions {
            let trimmed = ext.trim().trim_start_matches('.');
            if trimmed.is_empty() {
                issues.push(ValidationIssue::InvalidValue {
                    field: "extensions",
                    message: "extension cannot be empty".to_string(),
                });
            } else if !is_plain_name(trimmed) {
                issues.push(ValidationIssue::InvalidValue {
                    field: "extensions",
                    message: format!("'{ext}' contains a path separator"),
                });
            }
        }

        if self.backup_dir_name.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "backup_dir_name",
            });
        } else if !is_plain_name(&self.backup_dir_name) {
            issues.push(ValidationIssue::InvalidValue {
                field: "backup_dir_name",
                message: "must be a single directory name".to_string(),
            });
        }

        if self.directories.iter().any(|d| d.as_os_str().is_empty()) {
            issues.push(ValidationIssue::InvalidValue {
                field: "directories",
                message: "entries must not be empty".to_string(),
            });
        }

        if self.keep_backups == 0 {
            issues.push(ValidationIssue::InvalidValue {
                field: "keep_backups",
                message: "must keep at least one backup".to_string(),
            });
        }

        if self.global_settings_file.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "global_settings_file",
            });
        } else if !is_plain_name(&self.global_settings_file) {
            issues.push(ValidationIssue::InvalidValue {
                field: "global_settings_file",
                message: "must be a file name".to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            extensions: self
                .extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .collect(),
            backup_dir_name: self.backup_dir_name.clone(),
        }
    }

    pub fn backup_policy(&self) -> BackupPolicy {
        BackupPolicy {
            dir_name: self.backup_dir_name.clone(),
            keep: self.keep_backups,
        }
    }

    pub fn globals_store(&self) -> GlobalSettingsStore {
        GlobalSettingsStore {
            file_name: self.global_settings_file.clone(),
            policy: self.backup_policy(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Every problem found by [`EditorConfig::validate`], one per line.
#[derive(Error, Debug, Clone)]
#[error("{}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("invalid '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}
