// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid tracker config: {0}")]
    Invalid(String),
}

/// Tunable constants of the fusion and tracking layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Wrist-to-wrist distance (pixels) under which two candidates are the same hand.
    pub duplicate_threshold_px: f64,
    /// Weight of the newest candidate in the landmark moving average.
    pub smoothing_factor: f64,
    /// Grace period for the opposite slot when only one hand is visible.
    pub cross_hand_stale_ms: u64,
    /// Time without updates after which a slot is cleared.
    pub track_stale_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold_px: 100.0,
            smoothing_factor: 0.4,
            cross_hand_stale_ms: 500,
            track_stale_ms: 1000,
        }
    }
}

impl TrackerConfig {
    pub fn cross_hand_stale(&self) -> Duration {
        Duration::from_millis(self.cross_hand_stale_ms)
    }

    pub fn track_stale(&self) -> Duration {
        Duration::from_millis(self.track_stale_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.duplicate_threshold_px.is_finite() || self.duplicate_threshold_px <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "duplicateThresholdPx must be a positive number, got {}",
                self.duplicate_threshold_px
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err(ConfigError::Invalid(format!(
                "smoothingFactor must be within [0, 1], got {}",
                self.smoothing_factor
            )));
        }
        if self.cross_hand_stale_ms > self.track_stale_ms {
            return Err(ConfigError::Invalid(format!(
                "crossHandStaleMs ({}) must not exceed trackStaleMs ({})",
                self.cross_hand_stale_ms, self.track_stale_ms
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Budget for a single region's detection before its result is treated as empty.
    pub detect_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detect_timeout_ms: 33,
        }
    }
}

impl PipelineConfig {
    pub fn detect_timeout(&self) -> Duration {
        Duration::from_millis(self.detect_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Flip frames horizontally before detection, so slots follow the displayed image.
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
            mirror: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub tracker: TrackerConfig,
    pub pipeline: PipelineConfig,
    pub camera: CameraConfig,
    pub output_directory: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tracker: TrackerConfig::default(),
            pipeline: PipelineConfig::default(),
            camera: CameraConfig::default(),
            output_directory: directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("HandTracker")))
                .unwrap_or_else(|| PathBuf::from("./output")),
        }
    }
}

impl AppConfig {
    /// Loads the config from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        tracing::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig =
            serde_json::from_str(content).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        config.tracker.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.duplicate_threshold_px, 100.0);
        assert_eq!(config.smoothing_factor, 0.4);
        assert_eq!(config.cross_hand_stale(), Duration::from_millis(500));
        assert_eq!(config.track_stale(), Duration::from_millis(1000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AppConfig::from_json(
            r#"{ "tracker": { "smoothingFactor": 0.25 }, "camera": { "mirror": false } }"#,
        )
        .unwrap();
        assert_eq!(config.tracker.smoothing_factor, 0.25);
        assert_eq!(config.tracker.duplicate_threshold_px, 100.0);
        assert_eq!(config.tracker.track_stale_ms, 1000);
        assert!(!config.camera.mirror);
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.pipeline.detect_timeout_ms, 33);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_factor = TrackerConfig {
            smoothing_factor: 1.5,
            ..TrackerConfig::default()
        };
        assert!(matches!(bad_factor.validate(), Err(ConfigError::Invalid(_))));

        let bad_timeouts = TrackerConfig {
            cross_hand_stale_ms: 2000,
            ..TrackerConfig::default()
        };
        assert!(bad_timeouts.validate().is_err());

        assert!(AppConfig::from_json(r#"{ "tracker": { "duplicateThresholdPx": -1 } }"#).is_err());
        assert!(AppConfig::from_json("not json").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config.tracker, TrackerConfig::default());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "tracker": { "trackStaleMs": 1500 } }"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.tracker.track_stale_ms, 1500);
    }
}
