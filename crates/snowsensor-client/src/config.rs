//! Sensor configuration.
//!
//! The configuration lives in a small `name=value` file (`sensor.conf` by
//! default), the dialect the sensor has been deployed with: one setting per
//! line, `#` comments and blank lines ignored, keys case-insensitive. A
//! missing file yields the built-in defaults, which the CLI then persists so
//! operators have a file to edit.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

/// Errors from loading or parsing a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was opened.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A setting has a value that does not parse.
    #[error("invalid configuration entry '{name}={value}'")]
    InvalidValue {
        /// Setting name.
        name: String,
        /// Offending value.
        value: String,
    },

    /// A setting name is not recognized.
    #[error("unknown config setting '{0}'")]
    UnknownSetting(String),

    /// The retry count must be positive or no I/O would ever be attempted.
    #[error("retry count must be at least 1, got {0}")]
    InvalidRetry(u32),
}

/// Connection target, retry policy and calibration constants for one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    /// Measurement read attempts before giving up. Must be at least 1.
    pub retry: u32,
    /// Distance reading of the empty reference surface.
    pub zeroline: f32,
    /// Raw-unit to height-unit conversion factor.
    pub scale: f32,
    /// Additive height correction.
    pub offset: f32,
    /// Laser warmup delay in milliseconds before the first reading.
    pub warmup_ms: u64,
    /// Sensor host name or address.
    pub host: String,
    /// Sensor TCP port.
    pub port: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            retry: 4,
            zeroline: 2200.0,
            scale: 0.1,
            offset: 0.0,
            warmup_ms: 1000,
            host: "192.168.0.44".to_string(),
            port: "10001".to_string(),
        }
    }
}

impl SensorConfig {
    /// Load configuration from `path`.
    ///
    /// Returns the configuration and whether the built-in defaults were used
    /// because the file does not exist. Settings absent from the file keep
    /// their default values.
    pub fn load(path: &Path) -> Result<(SensorConfig, bool), ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "config file {} not found, using default configuration",
                    path.display()
                );
                return Ok((SensorConfig::default(), true));
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };

        let config = Self::parse(&text)?;
        Ok((config, false))
    }

    /// Parse configuration text in the `name=value` dialect.
    pub fn parse(text: &str) -> Result<SensorConfig, ConfigError> {
        let mut config = SensorConfig::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((name, value)) = line.split_once('=') {
                config.set_value(name.trim(), value.trim())?;
            }
        }

        if config.retry < 1 {
            return Err(ConfigError::InvalidRetry(config.retry));
        }
        Ok(config)
    }

    /// Apply one setting by name.
    pub fn set_value(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        match name.to_lowercase().as_str() {
            "scale" => self.scale = parse_num(name, value)?,
            "offset" => self.offset = parse_num(name, value)?,
            "zeroline" => self.zeroline = parse_num(name, value)?,
            "retry" => self.retry = parse_num(name, value)?,
            "warmup" => self.warmup_ms = parse_num(name, value)?,
            "host" => self.host = value.to_string(),
            "port" => self.port = value.to_string(),
            // Logging moved to the environment; old files may still carry these.
            "logfile" | "loglevel" => {
                warn!("ignoring obsolete config setting '{}'", name);
            }
            _ => return Err(ConfigError::UnknownSetting(name.to_string())),
        }
        Ok(())
    }

    /// Write the configuration back out in the same dialect.
    pub fn store(&self, path: &Path) -> io::Result<()> {
        let mut out = String::new();
        let _ = writeln!(out, "retry={}", self.retry);
        let _ = writeln!(out, "offset={}", self.offset);
        let _ = writeln!(out, "scale={}", self.scale);
        let _ = writeln!(out, "zeroline={}", self.zeroline);
        let _ = writeln!(out, "host={}", self.host);
        let _ = writeln!(out, "port={}", self.port);
        let _ = writeln!(out, "warmup={}", self.warmup_ms);
        fs::write(path, out)
    }
}

fn parse_num<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SensorConfig::default();
        assert_eq!(config.retry, 4);
        assert_eq!(config.zeroline, 2200.0);
        assert_eq!(config.scale, 0.1);
        assert_eq!(config.offset, 0.0);
        assert_eq!(config.warmup_ms, 1000);
    }

    #[test]
    fn test_parse_overrides_and_comments() {
        let text = "\
# sensor at the north site
retry = 2
zeroline=1800.5

host = 10.0.0.7
port= 4001
warmup =250
";
        let config = SensorConfig::parse(text).expect("parse");
        assert_eq!(config.retry, 2);
        assert_eq!(config.zeroline, 1800.5);
        assert_eq!(config.host, "10.0.0.7");
        assert_eq!(config.port, "4001");
        assert_eq!(config.warmup_ms, 250);
        // Unset keys keep their defaults.
        assert_eq!(config.scale, 0.1);
    }

    #[test]
    fn test_parse_rejects_unknown_setting() {
        assert!(matches!(
            SensorConfig::parse("laser=1\n"),
            Err(ConfigError::UnknownSetting(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_value() {
        assert!(matches!(
            SensorConfig::parse("zeroline=tall\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_zero_retry() {
        assert!(matches!(
            SensorConfig::parse("retry=0\n"),
            Err(ConfigError::InvalidRetry(0))
        ));
    }

    #[test]
    fn test_obsolete_settings_are_ignored() {
        let config = SensorConfig::parse("loglevel=2\nlogfile=/tmp/x.log\nretry=3\n")
            .expect("parse");
        assert_eq!(config.retry, 3);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope.conf");
        let (config, used_defaults) = SensorConfig::load(&path).expect("load");
        assert!(used_defaults);
        assert_eq!(config, SensorConfig::default());
    }

    #[test]
    fn test_store_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sensor.conf");

        let mut config = SensorConfig::default();
        config.retry = 7;
        config.scale = 0.25;
        config.host = "sensor.local".to_string();
        config.store(&path).expect("store");

        let (loaded, used_defaults) = SensorConfig::load(&path).expect("load");
        assert!(!used_defaults);
        assert_eq!(loaded, config);
    }
}
