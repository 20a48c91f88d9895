//! Centralized application directory paths for taskbell.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | App data | `~/Library/Application Support/taskbell/` | `~/.local/share/taskbell/` |
//! | Config | `~/Library/Application Support/taskbell/` | `~/.config/taskbell/` |
//!
//! # Environment Overrides
//!
//! - `TASKBELL_DATA_DIR` overrides [`data_dir`]
//! - `TASKBELL_CONFIG_DIR` overrides [`config_dir`]

use std::ffi::OsString;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "taskbell";

fn resolve_dir(override_dir: Option<OsString>, platform_dir: Option<PathBuf>, fallback: &str) -> PathBuf {
    if let Some(dir) = override_dir {
        return PathBuf::from(dir);
    }
    platform_dir
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(fallback))
}

/// Application data root directory.
///
/// Holds the per-user task files.
#[must_use]
pub fn data_dir() -> PathBuf {
    resolve_dir(
        std::env::var_os("TASKBELL_DATA_DIR"),
        dirs::data_dir(),
        "/tmp/taskbell-data",
    )
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    resolve_dir(
        std::env::var_os("TASKBELL_CONFIG_DIR"),
        dirs::config_dir(),
        "/tmp/taskbell-config",
    )
}

/// Directory holding one task file per user (`data_dir()/tasks/`).
#[must_use]
pub fn tasks_dir() -> PathBuf {
    data_dir().join("tasks")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_over_platform_dir() {
        let dir = resolve_dir(
            Some(OsString::from("/custom/data")),
            Some(PathBuf::from("/home/u/.local/share")),
            "/tmp/x",
        );
        assert_eq!(dir, PathBuf::from("/custom/data"));
    }

    #[test]
    fn platform_dir_gets_app_suffix() {
        let dir = resolve_dir(None, Some(PathBuf::from("/home/u/.local/share")), "/tmp/x");
        assert_eq!(dir, PathBuf::from("/home/u/.local/share/taskbell"));
    }

    #[test]
    fn fallback_used_without_platform_dir() {
        let dir = resolve_dir(None, None, "/tmp/taskbell-data");
        assert_eq!(dir, PathBuf::from("/tmp/taskbell-data"));
    }

    #[test]
    fn tasks_dir_is_subpath_of_data_dir() {
        let tasks = tasks_dir();
        assert!(tasks.ends_with("tasks"), "tasks_dir: {}", tasks.display());
    }

    #[test]
    fn config_file_ends_with_config_toml() {
        let path = config_file();
        let s = path.to_string_lossy();
        assert!(s.ends_with("config.toml"), "config_file: {s}");
    }
}
