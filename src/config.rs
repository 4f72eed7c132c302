// Configuration for binned phase timing analysis
//
// Loaded from an optional TOML file, then overridden by command-line flags.

use crate::binning::DEFAULT_BIN_COUNT;
use crate::error::{PhaseTimesError, PhaseTimesResult};
use crate::parser::DEFAULT_HEADER_MARKER;
use crate::report::ReportFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one analysis run
///
/// # Example
/// ```
/// use phase_times::config::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(config.bins, 50);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Number of rank bins per configuration
    ///
    /// Compilations are sorted by total time and split into this many
    /// groups. Fewer bins are populated when there are fewer compilations.
    #[serde(default = "default_bins")]
    pub bins: usize,

    /// Directory that receives `<configuration>.csv` (or `.json`)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Report file format
    #[serde(default)]
    pub format: ReportFormat,

    /// Substring identifying configuration header lines in the build log
    ///
    /// Default: the flag that turns on timing for every SSA phase.
    #[serde(default = "default_header_marker")]
    pub header_marker: String,
}

fn default_bins() -> usize {
    DEFAULT_BIN_COUNT
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_header_marker() -> String {
    DEFAULT_HEADER_MARKER.to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bins: default_bins(),
            output_dir: default_output_dir(),
            format: ReportFormat::default(),
            header_marker: default_header_marker(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a TOML config document; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> PhaseTimesResult<Self> {
        let config: AnalysisConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> PhaseTimesResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PhaseTimesError::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> PhaseTimesResult<()> {
        if self.bins == 0 {
            return Err(PhaseTimesError::Config("bins must be >= 1, got 0".to_string()));
        }

        if self.header_marker.is_empty() {
            return Err(PhaseTimesError::Config(
                "header_marker must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
