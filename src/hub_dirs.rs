//! Centralized application directory paths for Access Hub.
//!
//! Provides a single source of truth for the filesystem paths used by the
//! scheduler core. Uses the [`dirs`] crate for platform-appropriate
//! directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | Windows | macOS | Linux |
//! |---------|---------|-------|-------|
//! | Config | `%APPDATA%\access-hub\` | `~/Library/Application Support/access-hub/` | `~/.config/access-hub/` |
//!
//! # Environment Overrides
//!
//! The config path can be overridden for testing or portable installs:
//! - `ACCESS_HUB_CONFIG_DIR` — overrides [`config_dir`]

use std::path::PathBuf;

/// Application config directory.
///
/// Used for `scheduled_tasks.json` and other configuration files.
///
/// Resolves to `dirs::config_dir()/access-hub/` by default. Override with
/// the `ACCESS_HUB_CONFIG_DIR` environment variable.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("ACCESS_HUB_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("access-hub"))
        .unwrap_or_else(|| PathBuf::from("/tmp/access-hub-config"))
}

/// Persisted task store path (`config_dir()/scheduled_tasks.json`).
#[must_use]
pub fn tasks_file() -> PathBuf {
    config_dir().join("scheduled_tasks.json")
}
