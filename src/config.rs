use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::strategy::StrategyKind;

/// Upper bound for the sampling frame rate.
pub const MAX_FRAMES_PER_SECOND: u32 = 1000;

/// Errors raised while loading or validating a [`TapConfig`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration for the acquisition engine.
///
/// Every section carries `#[serde(default)]`, so a JSON file only needs the
/// values it wants to change:
///
/// ```json
/// { "analyser": { "fft_size": 1024 }, "acquisition": { "attempt_timeout_ms": 5000 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    pub analyser: AnalyserConfig,
    pub acquisition: AcquisitionConfig,
    pub synthesis: SynthesisConfig,
    pub sampling: SamplingConfig,
    pub provider: ProviderConfig,
}

/// Analysis stage parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    pub sample_rate: f32,
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            fft_size: 2048,
            smoothing: 0.85,
            // Byte range of the frequency buffer
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserConfig {
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(ConfigError::Invalid(format!(
                "fft_size must be a power of two in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(ConfigError::Invalid(format!(
                "smoothing must be within 0.0..=1.0, got {}",
                self.smoothing
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(ConfigError::Invalid(
                "min_decibels must be below max_decibels".to_string(),
            ));
        }
        if !(self.sample_rate > 0.0) {
            return Err(ConfigError::Invalid("sample_rate must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Trial order, most faithful source first.
    pub strategies: Vec<StrategyKind>,
    /// Upper bound for a single attempt; unbounded when unset.
    pub attempt_timeout_ms: Option<u64>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::DEFAULT_ORDER.to_vec(),
            attempt_timeout_ms: None,
        }
    }
}

/// Oscillator parameters for the synthetic strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Control-surface bank, bass to treble
    pub frequencies: Vec<f32>,
    pub update_interval_ms: u64,
    pub demo_frequency: f32,
    pub demo_gain: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            frequencies: vec![60.0, 120.0, 240.0, 480.0, 960.0, 1920.0, 3840.0],
            update_interval_ms: 33, // ~30 updates per second
            demo_frequency: 440.0,
            demo_gain: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub frames_per_second: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { frames_per_second: 60 }
    }
}

/// URL fragments identifying media that belongs to the video provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub url_patterns: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url_patterns: vec![
                "youtube.com".to_string(),
                "youtube-nocookie.com".to_string(),
                "youtu.be".to_string(),
                "googlevideo.com".to_string(),
            ],
        }
    }
}

impl ProviderConfig {
    pub fn matches(&self, url: &str) -> bool {
        !url.is_empty()
            && self
                .url_patterns
                .iter()
                .any(|pattern| url.contains(pattern.as_str()))
    }
}

impl TapConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: TapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analyser.validate()?;
        if self.synthesis.update_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "synthesis update interval must be non-zero".to_string(),
            ));
        }
        if !(1..=MAX_FRAMES_PER_SECOND).contains(&self.sampling.frames_per_second) {
            return Err(ConfigError::Invalid(format!(
                "frames_per_second must be within 1..={}, got {}",
                MAX_FRAMES_PER_SECOND, self.sampling.frames_per_second
            )));
        }
        Ok(())
    }
}
