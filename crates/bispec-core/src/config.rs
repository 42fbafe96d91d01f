//! # Configuration System
//!
//! YAML configuration for bispectral analysis runs:
//!
//! - Axis roles (which axis is frequency, which one is averaged over)
//! - Averaging mode (plain mean or centered rolling mean)
//! - Noise level below which bicoherence is not reported
//! - Logging
//!
//! Every field has a default, so a partial file is valid.
//!
//! ## Example Configuration
//!
//! ```yaml
//! analysis:
//!   freq_dim: frequency
//!   avg_dim: time
//!   avg_rolling: 8
//!   noise_level: 1.0e-12
//!
//! logging:
//!   level: debug
//!   format: json
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::observe::LogConfig;
use crate::types::{BispecError, BispecResult, Real};

/// Error type for configuration operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found
    NotFound(String),
    /// Failed to read or write configuration file
    ReadError(String),
    /// Failed to parse configuration
    ParseError(String),
    /// Invalid configuration value
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parameters of a bispectral computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Axis holding signed, ascending frequencies
    pub freq_dim: String,
    /// Axis averaged over (time, realization, ...)
    pub avg_dim: String,
    /// Centered rolling window along `avg_dim`; plain mean when unset
    pub avg_rolling: Option<usize>,
    /// Normalization threshold; machine epsilon of the spectrum's precision
    /// when unset
    pub noise_level: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            freq_dim: "frequency".to_string(),
            avg_dim: "time".to_string(),
            avg_rolling: None,
            noise_level: None,
        }
    }
}

impl AnalysisConfig {
    /// Configuration with custom axis names.
    pub fn new(freq_dim: impl Into<String>, avg_dim: impl Into<String>) -> Self {
        Self {
            freq_dim: freq_dim.into(),
            avg_dim: avg_dim.into(),
            ..Default::default()
        }
    }

    /// Average with a centered rolling window instead of a plain mean.
    pub fn with_rolling(mut self, window: usize) -> Self {
        self.avg_rolling = Some(window);
        self
    }

    pub fn with_noise_level(mut self, noise_level: f64) -> Self {
        self.noise_level = Some(noise_level);
        self
    }

    pub fn validate(&self) -> BispecResult<()> {
        if self.freq_dim.is_empty() || self.avg_dim.is_empty() {
            return Err(BispecError::InvalidParameter(
                "axis names must not be empty".into(),
            ));
        }
        if self.freq_dim == self.avg_dim {
            return Err(BispecError::InvalidParameter(format!(
                "frequency and averaging axis are both `{}`",
                self.freq_dim
            )));
        }
        if self.avg_rolling == Some(0) {
            return Err(BispecError::InvalidParameter(
                "avg_rolling must be at least 1".into(),
            ));
        }
        if let Some(level) = self.noise_level {
            if !level.is_finite() || level < 0.0 {
                return Err(BispecError::InvalidParameter(format!(
                    "noise_level must be finite and >= 0, got {}",
                    level
                )));
            }
        }
        Ok(())
    }

    /// The noise level in precision `F`, defaulting to `F::epsilon()`.
    pub fn resolve_noise_level<F: Real>(&self) -> BispecResult<F> {
        match self.noise_level {
            None => Ok(F::epsilon()),
            Some(level) => F::from_f64(level).ok_or_else(|| {
                BispecError::InvalidParameter(format!("noise_level {} not representable", level))
            }),
        }
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BispecConfig {
    /// Configuration version
    pub version: String,
    /// Computation parameters
    pub analysis: AnalysisConfig,
    /// Logging configuration
    pub logging: LogConfig,
}

impl Default for BispecConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            analysis: AnalysisConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl BispecConfig {
    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            analysis: AnalysisConfig::default()
                .with_rolling(8)
                .with_noise_level(1e-12),
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{LogFormat, LogLevel};

    #[test]
    fn test_default_config() {
        let config = BispecConfig::default();
        assert_eq!(config.analysis.freq_dim, "frequency");
        assert_eq!(config.analysis.avg_dim, "time");
        assert!(config.analysis.avg_rolling.is_none());
        assert!(config.analysis.noise_level.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
analysis:
  freq_dim: "freq"
  avg_dim: "shot"
  avg_rolling: 5
  noise_level: 1.0e-9

logging:
  level: trace
  format: pretty
"#;

        let config = BispecConfig::parse(yaml).unwrap();
        assert_eq!(config.analysis.freq_dim, "freq");
        assert_eq!(config.analysis.avg_dim, "shot");
        assert_eq!(config.analysis.avg_rolling, Some(5));
        assert_eq!(config.analysis.noise_level, Some(1e-9));
        assert_eq!(config.logging.level, LogLevel::Trace);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let config = BispecConfig::parse("analysis:\n  avg_rolling: 3\n").unwrap();
        assert_eq!(config.analysis.avg_rolling, Some(3));
        // Defaults should be applied
        assert_eq!(config.analysis.freq_dim, "frequency");
        assert_eq!(config.logging, LogConfig::default());
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        assert!(matches!(
            BispecConfig::parse("analysis:\n  avg_rolling: 0\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            BispecConfig::parse("analysis:\n  noise_level: -1.0\n"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            BispecConfig::parse("analysis: [1, 2]\n"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_analysis_validation() {
        assert!(AnalysisConfig::default().validate().is_ok());
        assert!(AnalysisConfig::new("time", "time").validate().is_err());
        assert!(AnalysisConfig::new("", "time").validate().is_err());
        assert!(AnalysisConfig::default()
            .with_noise_level(f64::NAN)
            .validate()
            .is_err());
        assert!(AnalysisConfig::default()
            .with_noise_level(0.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_resolve_noise_level() {
        let config = AnalysisConfig::default();
        assert_eq!(config.resolve_noise_level::<f64>().unwrap(), f64::EPSILON);
        assert_eq!(config.resolve_noise_level::<f32>().unwrap(), f32::EPSILON);

        let config = config.with_noise_level(0.5);
        assert_eq!(config.resolve_noise_level::<f32>().unwrap(), 0.5f32);
    }

    #[test]
    fn test_example_yaml() {
        let yaml = BispecConfig::example_yaml();
        assert!(yaml.contains("analysis:"));
        assert!(yaml.contains("avg_rolling: 8"));
        let parsed = BispecConfig::parse(&yaml).unwrap();
        assert_eq!(parsed.analysis.noise_level, Some(1e-12));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bispec.yaml");

        let config = BispecConfig {
            analysis: AnalysisConfig::new("f_hz", "ensemble").with_rolling(4),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = BispecConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BispecConfig::load_from(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        assert!(err.to_string().starts_with("config not found"));
    }
}
