//! Configuration file support for casetrack
//!
//! Reads from .casetrack/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Document storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Listing settings
    #[serde(default)]
    pub listing: ListingConfig,
}

/// Where uploaded case documents land
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Root directory for stored files
    /// Default: ".casetrack/files"
    #[serde(default = "default_files_dir")]
    pub files_dir: String,
}

/// Defaults for paginated case listings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ListingConfig {
    /// Page size used when the caller does not pass --limit
    /// Default: 20
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_files_dir() -> String {
    ".casetrack/files".to_string()
}

fn default_page_size() -> i64 {
    20
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            files_dir: default_files_dir(),
        }
    }
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl Config {
    /// Load config from .casetrack/config.toml
    /// Returns default config if file doesn't exist
    pub fn load() -> Self {
        if let Some(path) = Self::find_config_path() {
            if let Ok(contents) = std::fs::read_to_string(&path) {
                if let Ok(config) = toml::from_str(&contents) {
                    return config;
                }
            }
        }
        Self::default()
    }

    /// Find config.toml by walking up directory tree
    fn find_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(".casetrack").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.files_dir, ".casetrack/files");
        assert_eq!(config.listing.page_size, 20);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[storage]
files_dir = "/var/lib/casetrack/files"

[listing]
page_size = 50
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.files_dir, "/var/lib/casetrack/files");
        assert_eq!(config.listing.page_size, 50);
    }
}
