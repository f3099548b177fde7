//! Platform-specific directory defaults.
//!
//! - data: `~/.local/share/scrolls` on Linux, `~/Library/Application Support/scrolls` on macOS
//! - logs: the platform cache dir plus `logs`

use std::path::PathBuf;

fn project() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "scrolls")
}

pub fn data_dir() -> PathBuf {
    project()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./scroll_data"))
}

pub fn log_dir() -> PathBuf {
    project()
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/scrolls"))
        .join("logs")
}
