//! Module for application configuration settings.
//!
//! User configurations may be specified in a configuration file.

use bytesize::ByteSize;
use thiserror::Error;
use tracing::debug;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

fn rangefs_runtime_dir() -> Option<PathBuf> {
    let runtime_dir = dirs::runtime_dir();
    if let Some(path) = runtime_dir {
        return Some(path.join("rangefs"));
    }

    let home_dir = dirs::home_dir();
    if let Some(path) = home_dir {
        return Some(path.join(".local").join("share").join("rangefs"));
    }

    None
}

fn default_mount_point() -> PathBuf {
    rangefs_runtime_dir().map_or_else(|| PathBuf::from("/tmp/rangefs/mnt"), |rd| rd.join("mnt"))
}

fn default_block_size() -> ByteSize {
    ByteSize::mib(1)
}

/// One remote file to expose under the mount root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileEntry {
    /// Name of the entry as it appears in the mount root.
    pub name: String,

    /// Remote URL of the backing object. The server must honor HTTP range
    /// requests.
    pub url: String,
}

/// Application configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// The mount point for the filesystem.
    #[serde(default = "default_mount_point")]
    pub mount_point: PathBuf,

    /// Cache block size. Each remote fetch retrieves one block of this size.
    #[serde(default = "default_block_size")]
    pub block_size: ByteSize,

    /// The remote files to expose.
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mount_point: default_mount_point(),
            block_size: default_block_size(),
            files: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Config {
    /// Validate the correctness of the configuration.
    ///
    /// Returns:
    /// - `Ok(())` if the configuration is valid.
    /// - `Err(Vec<String>)` containing a list of validation error messages if the configuration
    ///   is not.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.files.is_empty() {
            errors.push("No files configured; nothing to mount.".to_owned());
        }

        if self.block_size.as_u64() == 0 {
            errors.push("block-size must be greater than zero.".to_owned());
        }

        let mut seen = std::collections::HashSet::new();
        for entry in &self.files {
            if entry.name.is_empty() {
                errors.push("A file entry has an empty name.".to_owned());
            }
            if entry.name.contains('/') {
                errors.push(format!(
                    "File name '{}' may not contain '/'.",
                    entry.name
                ));
            }
            if !seen.insert(entry.name.as_str()) {
                errors.push(format!("Duplicate file name '{}'.", entry.name));
            }
            if entry.url.is_empty() {
                errors.push(format!("File '{}' has an empty URL.", entry.name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Returns config file paths in descending priority order.
    /// On macOS, skips `dirs::config_dir()` (resolves to ~/Library/Application Support/).
    fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(not(target_os = "macos"))]
        if let Some(xdg) = dirs::config_dir() {
            paths.push(xdg.join("rangefs").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("rangefs").join("config.toml"));
        }

        paths.push(PathBuf::from("/etc/rangefs/config.toml"));

        paths
    }

    /// Finds the first existing config file from search paths.
    fn find_config_file() -> Option<PathBuf> {
        Self::config_search_paths().into_iter().find(|p| p.exists())
    }

    /// Loads config from a single TOML file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = ?path, "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads configuration from the first found config file, or the external
    /// path if given. Falls back to defaults when no file exists.
    pub fn load(external_config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = external_config_path {
            return Self::load_from_file(path);
        }

        match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }
}
