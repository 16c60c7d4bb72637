//! # Configuration
//!
//! Settings are loaded by [`confique`] from three layers, highest priority first:
//!
//! 1. **Environment variables**: `JOTTER_API_URL`, `JOTTER_PAGE_SIZE`, ...
//! 2. **Config file**: `jotter.toml` in the OS config directory (via the
//!    `directories` crate), or an explicit path.
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! A missing config file is not an error.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `api_url` | `http://localhost:5000/api` | Base URL of the notes service |
//! | `page_size` | `10` | Items per page for list views |
//! | `search_page_size` | `20` | Items per page for search results |
//! | `autosave_delay_ms` | `1000` | Quiet period before an autosave fires |
//! | `request_timeout_secs` | `30` | Per-request timeout |
//! | `reject_stale_updates` | `false` | Ignore responses older than the cached copy |

use crate::error::Result;
use crate::store::StoreSettings;
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "jotter.toml";

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JotterConfig {
    /// Base URL of the notes service, without a trailing slash.
    #[config(default = "http://localhost:5000/api", env = "JOTTER_API_URL")]
    pub api_url: String,

    #[config(default = 10, env = "JOTTER_PAGE_SIZE")]
    pub page_size: u32,

    #[config(default = 20, env = "JOTTER_SEARCH_PAGE_SIZE")]
    pub search_page_size: u32,

    /// Quiet period after the last edit before an autosave is sent.
    #[config(default = 1000, env = "JOTTER_AUTOSAVE_DELAY_MS")]
    pub autosave_delay_ms: u64,

    #[config(default = 30, env = "JOTTER_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// When set, a response whose `updatedAt` is older than the cached copy
    /// is dropped instead of overwriting it.
    #[config(default = false, env = "JOTTER_REJECT_STALE_UPDATES")]
    pub reject_stale_updates: bool,
}

impl Default for JotterConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api".to_string(),
            page_size: 10,
            search_page_size: 20,
            autosave_delay_ms: 1000,
            request_timeout_secs: 30,
            reject_stale_updates: false,
        }
    }
}

impl JotterConfig {
    /// Loads env, then `path` (or the default location), then defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.map(Path::to_path_buf).or_else(default_path);
        let mut builder = Self::builder().env();
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "loading config");
            builder = builder.file(file);
        }
        Ok(builder.load()?)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            page_size: self.page_size.max(1),
            search_page_size: self.search_page_size.max(1),
            reject_stale_updates: self.reject_stale_updates,
        }
    }
}

/// `<config dir>/jotter.toml` for the current platform.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "jotter").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults() {
        let config = JotterConfig::default();
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert_eq!(config.autosave_delay(), Duration::from_secs(1));
        let settings = config.store_settings();
        assert_eq!(settings.page_size, 10);
        assert_eq!(settings.search_page_size, 20);
        assert!(!settings.reject_stale_updates);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "page_size = 25\nreject_stale_updates = true\n").unwrap();

        let config = JotterConfig::load(Some(&path)).unwrap();
        assert_eq!(config.page_size, 25);
        assert!(config.reject_stale_updates);
        assert_eq!(config.search_page_size, 20);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = JotterConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.page_size, JotterConfig::default().page_size);
    }

    #[test]
    fn zero_sizes_are_clamped() {
        let config = JotterConfig {
            page_size: 0,
            ..Default::default()
        };
        assert_eq!(config.store_settings().page_size, 1);
    }
}
