//! File path helpers

use std::path::PathBuf;

use directories::BaseDirs;

/// Expand a user-supplied path to an absolute path
///
/// `~` and `~/...` resolve against the home directory; relative paths resolve
/// against the current directory; an empty string is the current directory.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let home = || BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    let expanded = if path == "~" {
        home().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        home()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}
