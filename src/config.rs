use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use uom::si::frequency::hertz;

use crate::controller::DEFAULT_POLL_INTERVAL;
use crate::controller::request::AcquisitionRequest;
use crate::streaming_task::{DEFAULT_BLOCK_SIZE, StreamSettings};

/// Margin on top of the nominal capture duration before a blocking capture times out
const CAPTURE_TIMEOUT_MARGIN: f64 = 1.25;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),
}

/// Settings of the host binary, every field may be omitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Device to open, the first enumerated device when absent
    pub device_serial: Option<String>,
    pub request: AcquisitionRequest,
    pub poll_interval_ms: u64,
    /// Samples per channel of the initial blocking capture
    pub capture_samples: usize,
    pub capture_timeout_ms: Option<u64>,
    pub block_size: usize,
    pub stream_seconds: u64,
    pub log_level: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            device_serial: None,
            request: AcquisitionRequest::default(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            capture_samples: 5000,
            capture_timeout_ms: None,
            block_size: DEFAULT_BLOCK_SIZE,
            stream_seconds: 2,
            log_level: "info".to_string(),
        }
    }
}

impl HostConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.log_level()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Configured timeout, or the nominal capture duration plus a 25% margin
    pub fn capture_timeout(&self) -> Duration {
        if let Some(timeout_ms) = self.capture_timeout_ms {
            return Duration::from_millis(timeout_ms);
        }

        let rate = self.request.sample_rate.get::<hertz>();
        if !rate.is_finite() || rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.capture_samples as f64 / rate * CAPTURE_TIMEOUT_MARGIN)
    }

    pub fn stream_settings(&self) -> StreamSettings {
        StreamSettings {
            period: self.poll_interval(),
            block_size: self.block_size,
        }
    }

    pub fn stream_duration(&self) -> Duration {
        Duration::from_secs(self.stream_seconds)
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[cfg(test)]
mod tests {
    use uom::si::{electric_potential::volt, frequency::hertz};

    use super::*;
    use crate::controller::request::ChannelId;

    #[test]
    fn empty_config_uses_defaults() {
        let config = HostConfig::from_json_str("{}").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.log_level().unwrap(), Level::INFO);
        assert_eq!(config.stream_settings().block_size, 100);
    }

    #[test]
    fn capture_timeout_adds_margin_to_nominal_duration() {
        let config = HostConfig::default();
        // 5000 samples at 1000 S/s
        assert_eq!(config.capture_timeout(), Duration::from_millis(6250));

        let fixed = HostConfig {
            capture_timeout_ms: Some(300),
            ..config
        };
        assert_eq!(fixed.capture_timeout(), Duration::from_millis(300));
    }

    #[test]
    fn partial_config_overrides_fields() {
        let config = HostConfig::from_json_str(
            r#"{
                "device_serial": "SN:210321ABC001",
                "request": { "channels": [1], "sample_rate": 20000.0, "range": 2.5 },
                "block_size": 250,
                "log_level": "debug"
            }"#,
        )
        .unwrap();

        assert_eq!(config.device_serial.as_deref(), Some("SN:210321ABC001"));
        assert_eq!(config.request.channels, vec![ChannelId::new(1)]);
        assert_eq!(config.request.sample_rate.get::<hertz>(), 20000.0);
        assert_eq!(config.request.range.get::<volt>(), 2.5);
        assert_eq!(config.block_size, 250);
        assert_eq!(config.capture_samples, 5000);
        assert_eq!(config.log_level().unwrap(), Level::DEBUG);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = HostConfig::from_json_str(r#"{ "log_level": "loud" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(level) if level == "loud"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = HostConfig::load("/nonexistent/wave_sense.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/wave_sense.json"));
    }
}
