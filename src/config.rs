// Settings file and per-run processing configuration

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::engine::profile::{Acceleration, EncodingProfile};

/// CRF/QP scale shared by every supported encoder
pub const MAX_QUALITY: u8 = 51;
pub const DEFAULT_QUALITY: u8 = 23;
pub const DEFAULT_OUTPUT: &str = "output.mp4";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub detection: DetectionSettings,

    #[serde(default)]
    pub encoding: EncodingSettings,

    #[serde(default)]
    pub playback: PlaybackSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Budget for each external inventory command, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingSettings {
    /// CRF/QP value (0-51, lower is better)
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Output file or streaming URL used when none is given
    #[serde(default = "default_output")]
    pub output: String,

    /// Skip GPU detection results and always encode with libx264
    #[serde(default)]
    pub force_software: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSettings {
    /// Ask to play the result after encoding
    #[serde(default = "default_true")]
    pub offer: bool,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            output: default_output(),
            force_software: false,
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            offer: default_true(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file. Missing sections fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(settings)
    }

    /// Built-in defaults unless a settings file was given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.encoding.quality > MAX_QUALITY {
            bail!(
                "encoding.quality must be between 0 and {}, got {}",
                MAX_QUALITY,
                self.encoding.quality
            );
        }
        if self.detection.timeout_secs == 0 {
            bail!("detection.timeout_secs must be at least 1");
        }
        if self.encoding.output.trim().is_empty() {
            bail!("encoding.output must not be empty");
        }
        Ok(())
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_secs(self.detection.timeout_secs)
    }
}

/// Parse a user-entered quality; `None` for anything outside 0-51
pub fn parse_quality(input: &str) -> Option<u8> {
    input
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|q| *q <= MAX_QUALITY)
}

/// Everything one ffmpeg run needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingConfig {
    pub acceleration: Acceleration,
    pub codec: String,
    pub quality: u8,
    pub preset: String,
    /// File path or stream URL
    pub input: String,
    /// File path or stream URL
    pub output: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        let profile = EncodingProfile::software();
        Self {
            acceleration: profile.acceleration,
            codec: profile.codec.to_string(),
            quality: DEFAULT_QUALITY,
            preset: profile.preset.to_string(),
            input: String::new(),
            output: DEFAULT_OUTPUT.to_string(),
        }
    }
}

impl ProcessingConfig {
    /// Software defaults with quality and output taken from the settings file
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            quality: settings.encoding.quality,
            output: settings.encoding.output.clone(),
            ..Self::default()
        }
    }

    pub fn apply_profile(&mut self, profile: EncodingProfile) {
        self.acceleration = profile.acceleration;
        self.codec = profile.codec.to_string();
        self.preset = profile.preset.to_string();
    }

    pub fn set_software_encoding(&mut self) {
        self.apply_profile(EncodingProfile::software());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.detection.timeout_secs, 10);
        assert_eq!(settings.encoding.quality, 23);
        assert_eq!(settings.encoding.output, "output.mp4");
        assert!(!settings.encoding.force_software);
        assert!(settings.playback.offer);
        assert_eq!(settings.detection_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str("[encoding]\nquality = 18\n").unwrap();
        assert_eq!(settings.encoding.quality, 18);
        assert_eq!(settings.encoding.output, "output.mp4");
        assert_eq!(settings.detection.timeout_secs, 10);
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut settings = Settings::default();
        settings.encoding.quality = 52;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("between 0 and 51"));

        settings.encoding.quality = 51;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut settings = Settings::default();
        settings.detection.timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_quality() {
        assert_eq!(parse_quality("0"), Some(0));
        assert_eq!(parse_quality(" 28 \n"), Some(28));
        assert_eq!(parse_quality("51"), Some(51));
        assert_eq!(parse_quality("52"), None);
        assert_eq!(parse_quality("-1"), None);
        assert_eq!(parse_quality("high"), None);
        assert_eq!(parse_quality(""), None);
    }

    #[test]
    fn test_processing_config_from_settings() {
        let mut settings = Settings::default();
        settings.encoding.quality = 30;
        settings.encoding.output = "rtmp://localhost/live".to_string();

        let mut cfg = ProcessingConfig::from_settings(&settings);
        assert_eq!(cfg.acceleration, Acceleration::Software);
        assert_eq!(cfg.codec, "libx264");
        assert_eq!(cfg.quality, 30);
        assert_eq!(cfg.output, "rtmp://localhost/live");

        cfg.apply_profile(EncodingProfile::for_acceleration(Acceleration::Cuda));
        assert_eq!(cfg.codec, "h264_nvenc");
        assert_eq!(cfg.preset, "medium");

        cfg.set_software_encoding();
        assert_eq!(cfg.codec, "libx264");
    }
}
