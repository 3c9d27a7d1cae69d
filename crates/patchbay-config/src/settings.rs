//! Device, stream and control-surface settings.

use std::path::Path;

use patchbay_core::{DEFAULT_MAX_DB, MixerConfig};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::file;

/// A MIDI controller that runs a shell command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Button {
    /// Controller number that triggers the command.
    pub cc: u8,
    /// Command line passed to the system shell.
    pub command: String,
}

/// Contents of `settings.toml`.
///
/// Every key is optional; missing keys take their defaults.
///
/// ```toml
/// audio_device = "Scarlett"
/// midi_in = "nanoKONTROL2"
/// midi_out = "Through Port"
/// sample_rate = 48000
/// buffer_size = 256
/// max_db = 12.0
///
/// [[buttons]]
/// cc = 41
/// command = "mpc toggle"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Audio device name or index; the system default if absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_device: Option<String>,

    /// MIDI input port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi_in: Option<String>,

    /// MIDI output port that receives every incoming message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi_out: Option<String>,

    /// Stream sample rate in Hz.
    pub sample_rate: u32,

    /// Stream buffer size in frames.
    pub buffer_size: u32,

    /// Fader headroom at full MIDI travel, in dB.
    pub max_db: f32,

    /// Controller-triggered commands.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio_device: None,
            midi_in: None,
            midi_out: None,
            sample_rate: 48000,
            buffer_size: 512,
            max_db: DEFAULT_MAX_DB,
            buttons: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        file::load(path.as_ref())
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save settings to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        file::save(self, path.as_ref())
    }

    /// Convert to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Mixer parameters derived from these settings.
    pub fn mixer_config(&self) -> MixerConfig {
        MixerConfig {
            sample_rate: self.sample_rate as f32,
            max_db: self.max_db,
        }
    }

    /// The button bound to controller `cc`, if any.
    pub fn button(&self, cc: u8) -> Option<&Button> {
        self.buttons.iter().find(|b| b.cc == cc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.sample_rate, 48000);
        assert_eq!(settings.buffer_size, 512);
        assert_eq!(settings.max_db, 12.0);
    }

    #[test]
    fn test_parse_full() {
        let settings = Settings::from_toml(
            r#"
            audio_device = "Scarlett"
            midi_in = "nanoKONTROL2"
            sample_rate = 44100
            max_db = 6.0

            [[buttons]]
            cc = 41
            command = "mpc toggle"
            "#,
        )
        .unwrap();

        assert_eq!(settings.audio_device.as_deref(), Some("Scarlett"));
        assert_eq!(settings.midi_out, None);
        assert_eq!(settings.buffer_size, 512);
        assert_eq!(settings.button(41).unwrap().command, "mpc toggle");
        assert!(settings.button(42).is_none());

        let mixer = settings.mixer_config();
        assert_eq!(mixer.sample_rate, 44100.0);
        assert_eq!(mixer.max_db, 6.0);
    }

    #[test]
    fn test_to_toml_omits_unset() {
        let text = Settings::default().to_toml().unwrap();
        assert!(!text.contains("audio_device"));
        assert!(!text.contains("buttons"));
        assert!(text.contains("sample_rate = 48000"));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        assert!(matches!(
            Settings::from_toml("sample_rate = \"fast\""),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
