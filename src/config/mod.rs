// src/config/mod.rs
//! Configuration module for analyzer and display settings.
//!
//! Everything is optional in the TOML file; missing keys fall back to the
//! canonical defaults below.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest sample rate `configure` accepts.
pub const MIN_SAMPLE_RATE: f32 = 1_000.0;
/// Highest sample rate `configure` accepts.
pub const MAX_SAMPLE_RATE: f32 = 1_536_000.0;

const MIN_BLOCK_SIZE: usize = 64;
const MAX_BLOCK_SIZE: usize = 1 << 20;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("block size {0} must be a power of two between 64 and 1048576")]
    BlockSize(usize),
    #[error("at least two display points are required, got {0}")]
    TooFewPoints(usize),
    #[error("invalid display frequency range {min_hz} Hz .. {max_hz} Hz")]
    FrequencyRange { min_hz: f32, max_hz: f32 },
    #[error("{name} = {value} is outside {range}")]
    OutOfRange {
        name: &'static str,
        value: f32,
        range: &'static str,
    },
    #[error("display floor {floor_db} dB must be below ceiling {ceiling_db} dB")]
    DisplayRange { floor_db: f32, ceiling_db: f32 },
    #[error("smoothing radius {radius} exceeds the number of display points {num_points}")]
    SmoothingRadius { radius: usize, num_points: usize },
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parameters of the spectral estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Samples per analysis block (power of two)
    pub block_size: usize,
    /// Number of log-spaced display frequencies
    pub num_points: usize,
    /// Lowest display frequency in Hz
    pub min_hz: f32,
    /// Highest display frequency in Hz
    pub max_hz: f32,
    /// Relative half-width of each display point's bin range (0.3 = ±30%)
    pub bandwidth: f32,
    /// Spectral tilt around 1 kHz, in dB per octave
    pub tilt_db_per_octave: f32,
    /// Blend factor for rising levels (0..=1, 1 = instant)
    pub attack: f32,
    /// Blend factor for falling levels (0..=1)
    pub release: f32,
    /// Per-cycle multiplier applied when no fresh block was analyzed
    pub decay: f32,
    /// Radius of the cross-band smoothing kernel, in display points (0 = off)
    pub smoothing_radius: usize,
    /// Bottom of the published range in dB
    pub floor_db: f32,
    /// Top of the published range in dB
    pub ceiling_db: f32,
    /// Consumer cadence in Hz
    pub refresh_hz: f32,
    /// Sample rate assumed until the producer calls `configure`
    pub default_sample_rate: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            block_size: 8192,
            num_points: 1024,
            min_hz: 20.0,
            max_hz: 20_000.0,
            bandwidth: 0.3,
            tilt_db_per_octave: 4.5,
            attack: 0.9,
            release: 0.25,
            decay: 0.85,
            smoothing_radius: 3,
            floor_db: -90.0,
            ceiling_db: 0.0,
            refresh_hz: 30.0,
            default_sample_rate: 44_100.0,
        }
    }
}

impl AnalyzerConfig {
    /// Check every parameter against the ranges the estimator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.block_size.is_power_of_two()
            || !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size)
        {
            return Err(ConfigError::BlockSize(self.block_size));
        }
        if self.num_points < 2 {
            return Err(ConfigError::TooFewPoints(self.num_points));
        }
        if !(self.min_hz.is_finite() && self.max_hz.is_finite())
            || self.min_hz <= 0.0
            || self.max_hz <= self.min_hz
        {
            return Err(ConfigError::FrequencyRange {
                min_hz: self.min_hz,
                max_hz: self.max_hz,
            });
        }

        check_range("bandwidth", self.bandwidth, 0.01, 4.0, "0.01..=4")?;
        check_range(
            "tilt_db_per_octave",
            self.tilt_db_per_octave,
            -24.0,
            24.0,
            "-24..=24",
        )?;
        check_range("attack", self.attack, f32::MIN_POSITIVE, 1.0, "(0, 1]")?;
        check_range("release", self.release, f32::MIN_POSITIVE, 1.0, "(0, 1]")?;
        check_range("decay", self.decay, 0.0, 0.999, "[0, 1)")?;
        check_range("refresh_hz", self.refresh_hz, 0.1, 1_000.0, "0.1..=1000")?;
        check_range(
            "default_sample_rate",
            self.default_sample_rate,
            MIN_SAMPLE_RATE,
            MAX_SAMPLE_RATE,
            "1000..=1536000",
        )?;

        if !(self.floor_db.is_finite() && self.ceiling_db.is_finite())
            || self.floor_db >= self.ceiling_db
        {
            return Err(ConfigError::DisplayRange {
                floor_db: self.floor_db,
                ceiling_db: self.ceiling_db,
            });
        }
        if self.smoothing_radius >= self.num_points {
            return Err(ConfigError::SmoothingRadius {
                radius: self.smoothing_radius,
                num_points: self.num_points,
            });
        }
        Ok(())
    }
}

fn check_range(
    name: &'static str,
    value: f32,
    min: f32,
    max: f32,
    range: &'static str,
) -> Result<(), ConfigError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { name, value, range })
    }
}

/// Terminal rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Bar width in characters
    pub bar_width: usize,
    /// Gap between bars
    pub bar_gap: usize,
    /// Redraw interval in milliseconds
    pub frame_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            bar_width: 2,
            bar_gap: 1,
            frame_ms: 33,
        }
    }
}

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub analyzer: AnalyzerConfig,
    pub display: DisplayConfig,
}

impl Settings {
    /// Parse settings from TOML text and validate them.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.analyzer.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings = Self::from_toml(&text)?;
        tracing::info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AnalyzerConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [analyzer]
            block_size = 1024
            num_points = 200

            [display]
            bar_width = 1
            "#,
        )
        .unwrap();

        assert_eq!(settings.analyzer.block_size, 1024);
        assert_eq!(settings.analyzer.num_points, 200);
        assert_eq!(settings.analyzer.floor_db, -90.0);
        assert_eq!(settings.display.bar_width, 1);
        assert_eq!(settings.display.bar_gap, 1);
    }

    #[test]
    fn rejects_non_power_of_two_block() {
        let config = AnalyzerConfig {
            block_size: 1000,
            ..AnalyzerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BlockSize(1000))));
    }

    #[test]
    fn rejects_inverted_display_range() {
        let config = AnalyzerConfig {
            floor_db: 0.0,
            ceiling_db: -10.0,
            ..AnalyzerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DisplayRange { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_factors() {
        for config in [
            AnalyzerConfig {
                attack: 0.0,
                ..AnalyzerConfig::default()
            },
            AnalyzerConfig {
                decay: 1.0,
                ..AnalyzerConfig::default()
            },
            AnalyzerConfig {
                bandwidth: f32::NAN,
                ..AnalyzerConfig::default()
            },
        ] {
            assert!(matches!(
                config.validate(),
                Err(ConfigError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            Settings::from_toml("[analyzer]\nblock_size = \"big\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_path_yields_defaults() {
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }
}
