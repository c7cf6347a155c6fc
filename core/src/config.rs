//! User settings persistence
//!
//! Settings live in the shared types crate; this module adds loading, saving
//! and key/value editing on top of confy.

use std::path::{Path, PathBuf};

use thiserror::Error;
use wodtimer_types::{MAX_BPM, MIN_BPM, Settings};

const APP_NAME: &str = "wodtimer";
const CONFIG_NAME: &str = "settings";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save settings")]
    Save(#[source] confy::ConfyError),

    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidSetting { key: String, value: String },

    #[error("unknown setting '{key}'")]
    UnknownSetting { key: String },
}

/// Setting keys accepted by [`SettingsExt::apply`]
pub const SETTING_KEYS: &[&str] = &[
    "voice",
    "sounds",
    "countdown3",
    "alert_volume",
    "metronome_volume",
    "metronome_default",
    "bpm",
    "wakelock",
    "millis",
];

/// Extension trait for Settings persistence
pub trait SettingsExt: Sized {
    /// Load from the platform config directory, falling back to defaults
    fn load() -> Self;
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn save_to(&self, path: &Path) -> Result<(), ConfigError>;
    fn config_path() -> Option<PathBuf>;

    /// Set one field from its textual form
    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
}

impl SettingsExt for Settings {
    fn load() -> Self {
        confy::load(APP_NAME, CONFIG_NAME).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load settings, using defaults");
            Settings::default()
        })
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Ok(confy::load_path(path)?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        confy::store_path(path, self).map_err(ConfigError::Save)
    }

    fn config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME).ok()
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        };

        match key {
            "voice" => self.voice = parse_flag(value).ok_or_else(invalid)?,
            "sounds" => self.sounds = parse_flag(value).ok_or_else(invalid)?,
            "countdown3" => self.countdown3 = parse_flag(value).ok_or_else(invalid)?,
            "metronome_default" => self.metronome_default = parse_flag(value).ok_or_else(invalid)?,
            "wakelock" => self.wakelock = parse_flag(value).ok_or_else(invalid)?,
            "millis" => self.millis = parse_flag(value).ok_or_else(invalid)?,
            "alert_volume" => self.alert_volume = parse_volume(value).ok_or_else(invalid)?,
            "metronome_volume" => self.metronome_volume = parse_volume(value).ok_or_else(invalid)?,
            "bpm" => {
                let bpm: u32 = value.trim().parse().map_err(|_| invalid())?;
                self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
            }
            _ => {
                return Err(ConfigError::UnknownSetting {
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_volume(value: &str) -> Option<u8> {
    value.trim().parse::<u8>().ok().filter(|v| *v <= 100)
}
