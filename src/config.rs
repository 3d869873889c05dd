//! Launcher settings.
//!
//! Defaults come from [`LauncherConfig::new`], an optional `launchpad.json` in the
//! data directory overrides them, and `LAUNCHPAD_*` environment variables win last.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "launchpad.json";
pub const TOOLS_DIR: &str = "tools";
pub const ICONS_DIR: &str = "icons";

const ENV_DATA_DIR: &str = "LAUNCHPAD_DATA_DIR";
const ENV_SHELL: &str = "LAUNCHPAD_SHELL";
const ENV_LOG: &str = "LAUNCHPAD_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LauncherConfig {
    /// Root holding `tools/` and `icons/`.
    pub data_dir: PathBuf,
    /// Shell program used instead of the platform default.
    pub shell: Option<String>,
    pub pty_cols: u16,
    pub pty_rows: u16,
    pub term: String,
    pub log_level: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            shell: None,
            pty_cols: 100,
            pty_rows: 40,
            term: "xterm-256color".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl LauncherConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load settings for the given default data directory.
    ///
    /// A missing config file is not an error. A malformed one is logged and ignored.
    pub fn load(default_data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = std::env::var(ENV_DATA_DIR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| default_data_dir.into());

        let mut config = Self::from_file(&data_dir.join(CONFIG_FILE)).unwrap_or_default();
        config.data_dir = data_dir;
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    fn from_file(path: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(config) => {
                log::info!("[Config] Loaded settings from {}", path.display());
                Some(config)
            }
            Err(e) => {
                log::warn!(
                    "[Config] Ignoring malformed settings file {}: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(shell) = lookup(ENV_SHELL).filter(|v| !v.trim().is_empty()) {
            self.shell = Some(shell);
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.data_dir.join(TOOLS_DIR)
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{ "ptyCols": 132 }"#).unwrap();

        let config = LauncherConfig::from_file(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.pty_cols, 132);
        assert_eq!(config.pty_rows, 40);
        assert_eq!(config.term, "xterm-256color");
    }

    #[test]
    fn malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(LauncherConfig::from_file(&dir.path().join(CONFIG_FILE)).is_none());
    }

    #[test]
    fn env_overrides_shell_and_level() {
        let mut config = LauncherConfig::new("/data");
        config.apply_env(|key| match key {
            "LAUNCHPAD_SHELL" => Some("/bin/zsh".to_string()),
            "LAUNCHPAD_LOG" => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.shell.as_deref(), Some("/bin/zsh"));
        assert_eq!(config.log_level_filter(), log::LevelFilter::Debug);
        assert_eq!(config.tools_dir(), PathBuf::from("/data").join("tools"));
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let mut config = LauncherConfig::default();
        config.log_level = "loud".into();
        assert_eq!(config.log_level_filter(), log::LevelFilter::Info);
    }
}
