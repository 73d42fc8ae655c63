//! Settings management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings")]
    Parse(#[from] serde_json::Error),
}

/// Runtime settings. Missing keys fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub frame: FrameSettings,
    pub logging: LogSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    pub tick_rate_hz: u32,
    /// Stop after this many frames; `None` runs until a system asks to quit.
    pub max_frames: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins when set.
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Log a metrics summary every N frames; 0 disables the report.
    pub report_every: u64,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            max_frames: Some(600),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self { report_every: 120 }
    }
}

impl RuntimeSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_documents_keep_defaults() {
        let settings =
            RuntimeSettings::from_json(r#"{ "frame": { "tick_rate_hz": 30 } }"#).unwrap();
        assert_eq!(settings.frame.tick_rate_hz, 30);
        assert_eq!(settings.frame.max_frames, Some(600));
        assert_eq!(settings.logging.filter, "info");
    }

    #[test]
    fn round_trips_through_json() {
        let mut settings = RuntimeSettings::default();
        settings.frame.max_frames = None;
        let text = settings.to_json().unwrap();
        assert_eq!(RuntimeSettings::from_json(&text).unwrap(), settings);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = RuntimeSettings::load("does/not/exist.json").unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }
}
