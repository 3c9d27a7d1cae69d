//! Where the configuration files live.
//!
//! All three files sit side by side in one directory:
//!
//! - `settings.toml`: devices, stream format, fader headroom, MIDI buttons
//! - `channels.toml`: channel layout
//! - `routing.toml`: channel settings and send levels
//!
//! The default directory is `~/.config/patchbay/` on Linux,
//! `~/Library/Application Support/patchbay/` on macOS and
//! `%APPDATA%\patchbay\` on Windows.

use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "patchbay";

/// Device and stream settings file name.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Channel layout file name.
pub const CHANNELS_FILE: &str = "channels.toml";

/// Routing file name.
pub const ROUTING_FILE: &str = "routing.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// `settings.toml` inside `dir`.
pub fn settings_path(dir: impl AsRef<Path>) -> PathBuf {
    dir.as_ref().join(SETTINGS_FILE)
}

/// `channels.toml` inside `dir`.
pub fn channels_path(dir: impl AsRef<Path>) -> PathBuf {
    dir.as_ref().join(CHANNELS_FILE)
}

/// `routing.toml` inside `dir`.
pub fn routing_path(dir: impl AsRef<Path>) -> PathBuf {
    dir.as_ref().join(ROUTING_FILE)
}
