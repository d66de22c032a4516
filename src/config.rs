//! Configuration System
//!
//! Measurement configuration with serde defaults, optional TOML file input
//! and `SPINCORR_` environment variable overrides, plus a validation pass.

use crate::error::MeasureError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Measurement run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrConfig {
    /// Observable output file.
    #[serde(default = "default_outfile")]
    pub outfile: PathBuf,

    /// Minimum cutoff above which snapshots are written.
    #[serde(default = "default_min_cutoff")]
    pub min_cutoff: f64,

    /// Maximum cutoff below which snapshots are written.
    #[serde(default = "default_max_cutoff")]
    pub max_cutoff: f64,

    /// Frequency transfer of the correlation. Zero measures the equal-time
    /// correlation.
    #[serde(default)]
    pub frequency_transfer: f64,

    /// Number of scheduler worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_outfile() -> PathBuf {
    PathBuf::from("correlations.obs")
}

fn default_min_cutoff() -> f64 {
    0.0
}

fn default_max_cutoff() -> f64 {
    f64::MAX
}

fn default_workers() -> usize {
    1
}

impl Default for CorrConfig {
    fn default() -> Self {
        Self {
            outfile: default_outfile(),
            min_cutoff: default_min_cutoff(),
            max_cutoff: default_max_cutoff(),
            frequency_transfer: 0.0,
            workers: default_workers(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CorrConfig {
    /// Load configuration from an optional TOML file, with `SPINCORR_`
    /// environment variables taking precedence.
    pub fn load(path: Option<&Path>) -> Result<Self, MeasureError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("SPINCORR")
                .separator("__")
                .ignore_empty(true),
        );
        let config: CorrConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), MeasureError> {
        if self.min_cutoff > self.max_cutoff {
            return Err(MeasureError::Config(format!(
                "min_cutoff ({}) must not exceed max_cutoff ({})",
                self.min_cutoff, self.max_cutoff
            )));
        }
        if self.workers == 0 {
            return Err(MeasureError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = CorrConfig::default();
        assert_eq!(config.outfile, PathBuf::from("correlations.obs"));
        assert_eq!(config.min_cutoff, 0.0);
        assert_eq!(config.frequency_transfer, 0.0);
        assert_eq!(config.workers, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "outfile = \"run.obs\"\nmin_cutoff = 0.1\nmax_cutoff = 50.0\nworkers = 4"
        )
        .unwrap();
        let config = CorrConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.outfile, PathBuf::from("run.obs"));
        assert_eq!(config.min_cutoff, 0.1);
        assert_eq!(config.max_cutoff, 50.0);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn test_validation_rejects_inverted_window() {
        let config = CorrConfig {
            min_cutoff: 2.0,
            max_cutoff: 1.0,
            ..CorrConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MeasureError::Config(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let config = CorrConfig {
            workers: 0,
            ..CorrConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialized_roundtrip() {
        let config = CorrConfig::default();
        let toml = toml::to_string(&config).unwrap();
        let back: CorrConfig = toml::from_str(&toml).unwrap();
        assert_eq!(back.min_cutoff, config.min_cutoff);
        assert_eq!(back.workers, config.workers);

        let json = serde_json::to_string(&config).unwrap();
        let back: CorrConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.outfile, config.outfile);
    }
}
