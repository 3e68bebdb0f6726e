//! Configuration file support for PainEase.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/painease/config.toml`.
//! Every field has a default, so partial files are fine.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Location of the session journal inside the data directory
    pub fn journal_path(&self) -> PathBuf {
        journal_path_in(&self.data_dir)
    }
}

/// Journal file for a given data directory
pub fn journal_path_in(data_dir: &Path) -> PathBuf {
    data_dir.join("journal").join("sessions.jsonl")
}

/// Step timing used when phase steps are generated (seconds)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    #[serde(default = "default_preparation_seconds")]
    pub preparation_seconds: u32,

    #[serde(default = "default_warmup_seconds")]
    pub warmup_seconds: u32,

    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u32,

    #[serde(default = "default_transition_seconds")]
    pub transition_seconds: u32,

    #[serde(default = "default_stretch_hold_seconds")]
    pub stretch_hold_seconds: u32,

    #[serde(default = "default_stretch_rest_seconds")]
    pub stretch_rest_seconds: u32,

    #[serde(default = "default_strength_active_seconds")]
    pub strength_active_seconds: u32,

    #[serde(default = "default_strength_rest_seconds")]
    pub strength_rest_seconds: u32,

    #[serde(default = "default_cardio_active_seconds")]
    pub cardio_active_seconds: u32,

    #[serde(default = "default_cardio_rest_seconds")]
    pub cardio_rest_seconds: u32,

    #[serde(default = "default_mobility_active_seconds")]
    pub mobility_active_seconds: u32,

    #[serde(default = "default_mobility_rest_seconds")]
    pub mobility_rest_seconds: u32,

    /// Body weight assumed by the calorie estimate
    #[serde(default = "default_body_weight_kg")]
    pub body_weight_kg: f64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            preparation_seconds: default_preparation_seconds(),
            warmup_seconds: default_warmup_seconds(),
            cooldown_seconds: default_cooldown_seconds(),
            transition_seconds: default_transition_seconds(),
            stretch_hold_seconds: default_stretch_hold_seconds(),
            stretch_rest_seconds: default_stretch_rest_seconds(),
            strength_active_seconds: default_strength_active_seconds(),
            strength_rest_seconds: default_strength_rest_seconds(),
            cardio_active_seconds: default_cardio_active_seconds(),
            cardio_rest_seconds: default_cardio_rest_seconds(),
            mobility_active_seconds: default_mobility_active_seconds(),
            mobility_rest_seconds: default_mobility_rest_seconds(),
            body_weight_kg: default_body_weight_kg(),
        }
    }
}

/// Audio engine parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,

    /// Gain of each tone or nature session beneath the master bus
    #[serde(default = "default_session_gain")]
    pub session_gain: f32,

    #[serde(default = "default_fade_out_seconds")]
    pub fade_out_seconds: f64,

    /// Length of each precomputed tone buffer
    #[serde(default = "default_tone_seconds")]
    pub tone_seconds: f32,

    #[serde(default = "default_tone_fade_seconds")]
    pub tone_fade_seconds: f32,

    /// Sample rate of the offline device
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Fixed seed for noise synthesis; random when absent
    #[serde(default)]
    pub noise_seed: Option<u64>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: default_master_volume(),
            session_gain: default_session_gain(),
            fade_out_seconds: default_fade_out_seconds(),
            tone_seconds: default_tone_seconds(),
            tone_fade_seconds: default_tone_fade_seconds(),
            sample_rate: default_sample_rate(),
            noise_seed: None,
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".local/share"),
        Err(_) => PathBuf::from("."),
    });
    base.join("painease")
}

fn default_preparation_seconds() -> u32 {
    10
}

fn default_warmup_seconds() -> u32 {
    30
}

fn default_cooldown_seconds() -> u32 {
    20
}

fn default_transition_seconds() -> u32 {
    5
}

fn default_stretch_hold_seconds() -> u32 {
    30
}

fn default_stretch_rest_seconds() -> u32 {
    10
}

fn default_strength_active_seconds() -> u32 {
    20
}

fn default_strength_rest_seconds() -> u32 {
    15
}

fn default_cardio_active_seconds() -> u32 {
    60
}

fn default_cardio_rest_seconds() -> u32 {
    30
}

fn default_mobility_active_seconds() -> u32 {
    20
}

fn default_mobility_rest_seconds() -> u32 {
    10
}

fn default_body_weight_kg() -> f64 {
    70.0
}

fn default_master_volume() -> f32 {
    0.7
}

fn default_session_gain() -> f32 {
    0.4
}

fn default_fade_out_seconds() -> f64 {
    1.0
}

fn default_tone_seconds() -> f32 {
    30.0
}

fn default_tone_fade_seconds() -> f32 {
    2.0
}

fn default_sample_rate() -> u32 {
    44_100
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the audio engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(Error::Config("audio.sample_rate must be positive".into()));
        }
        if !(self.audio.tone_seconds > 0.0) {
            return Err(Error::Config("audio.tone_seconds must be positive".into()));
        }
        if self.audio.tone_fade_seconds < 0.0
            || self.audio.tone_fade_seconds * 2.0 > self.audio.tone_seconds
        {
            return Err(Error::Config(format!(
                "audio.tone_fade_seconds {} does not fit in a {}s tone",
                self.audio.tone_fade_seconds, self.audio.tone_seconds
            )));
        }
        if !(self.runtime.body_weight_kg > 0.0) {
            return Err(Error::Config("runtime.body_weight_kg must be positive".into()));
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".config"),
            Err(_) => PathBuf::from("."),
        });
        base.join("painease").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.runtime.preparation_seconds, 10);
        assert_eq!(config.runtime.transition_seconds, 5);
        assert_eq!(config.runtime.body_weight_kg, 70.0);
        assert_eq!(config.audio.session_gain, 0.4);
        assert_eq!(config.audio.master_volume, 0.7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.runtime, parsed.runtime);
        assert_eq!(config.audio, parsed.audio);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[runtime]
transition_seconds = 2

[audio]
sample_rate = 8000
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.runtime.transition_seconds, 2);
        assert_eq!(config.runtime.cooldown_seconds, 20); // default
        assert_eq!(config.audio.sample_rate, 8000);
        assert_eq!(config.audio.fade_out_seconds, 1.0); // default
    }

    #[test]
    fn test_invalid_fade_rejected() {
        let toml_str = r#"
[audio]
tone_seconds = 3.0
tone_fade_seconds = 2.0
"#;
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, toml_str).unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.audio.noise_seed = Some(7);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.audio.noise_seed, Some(7));
    }

    #[test]
    fn test_journal_path_lives_under_data_dir() {
        let data = DataConfig {
            data_dir: PathBuf::from("/tmp/painease"),
        };
        assert_eq!(
            data.journal_path(),
            PathBuf::from("/tmp/painease/journal/sessions.jsonl")
        );
    }
}
