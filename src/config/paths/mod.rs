//! Path resolution: upward search and the home-derived default locations.

pub mod search;

pub use search::search;

use crate::error::ApiError;
use std::path::PathBuf;

/// The current user's home directory.
///
/// Honors `HOME` first so tests and sandboxed callers can redirect it, then
/// falls back to the platform lookup.
pub fn user_home() -> Result<PathBuf, ApiError> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| {
            ApiError::ConfigError("Could not determine home directory (HOME not set)".to_string())
        })
}

/// Default directory for global layers: `<home>/.<app>`.
pub fn global_dir(app: &str) -> Result<PathBuf, ApiError> {
    Ok(user_home()?.join(format!(".{}", app)))
}

/// File name of the shared layer for `app`.
pub fn shared_file_name(app: &str) -> String {
    format!("{}.config.json", app)
}

/// File name of the user layer for `app`.
pub fn user_file_name(app: &str) -> String {
    format!("{}.config.user.json", app)
}
