//! Loading `EditorConfig` from TOML.
//!
//! Save directories may start with `~` or `$HOME`; relative ones are taken
//! against the config file's own directory when loading from a path.

use crate::config::schema::{EditorConfig, ValidationError};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read editor config from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse editor config TOML{}: {source}", located(.path))]
    Toml {
        path: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid editor config{}: {source}", located(.path))]
    Validation {
        path: Option<PathBuf>,
        #[source]
        source: ValidationError,
    },
}

fn located(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default()
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = Some(path.to_path_buf());
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml { path, source },
            ConfigError::Validation { path: None, source } => {
                ConfigError::Validation { path, source }
            }
            other => other,
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

/// Expand a leading `~` or `$HOME`, then anchor a relative result at `base`.
pub fn resolve_directory(dir: &Path, home: Option<&Path>, base: Option<&Path>) -> PathBuf {
    let mut components = dir.components();
    let expanded = match (components.next(), home) {
        (Some(Component::Normal(first)), Some(home)) if first == "~" || first == "$HOME" => {
            home.join(components.as_path())
        }
        _ => dir.to_path_buf(),
    };
    match base {
        Some(base) if expanded.is_relative() => base.join(expanded),
        _ => expanded,
    }
}

fn resolve_directories(config: &mut EditorConfig, base: Option<&Path>) {
    let home = home_dir();
    for dir in &mut config.directories {
        *dir = resolve_directory(dir, home.as_deref(), base);
    }
}

fn parse(input: &str) -> Result<EditorConfig, ConfigError> {
    let config: EditorConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_str(input: &str) -> Result<EditorConfig, ConfigError> {
    let mut config = parse(input)?;
    resolve_directories(&mut config, None);
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EditorConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse(&contents).map_err(|error| error.with_path(path))?;
    let base = path.parent().filter(|p| !p.as_os_str().is_empty());
    resolve_directories(&mut config, base);
    log::debug!(
        "loaded editor config from {} ({} directories)",
        path.display(),
        config.directories.len()
    );
    Ok(config)
}
