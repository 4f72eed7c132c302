//! CLI argument parsing for phase-times

use crate::config::AnalysisConfig;
use crate::error::PhaseTimesResult;
use crate::report::ReportFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "phase-times")]
#[command(version)]
#[command(
    about = "Binned compiler phase timing profiles from a phase-timed build log",
    long_about = None
)]
pub struct Cli {
    /// Build log to read (standard input when omitted)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Directory for the per-configuration reports
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of rank bins per configuration
    #[arg(short = 'b', long = "bins", value_name = "N")]
    pub bins: Option<usize>,

    /// Report format
    #[arg(long = "format", value_enum)]
    pub format: Option<ReportFormat>,

    /// Substring that identifies configuration header lines
    #[arg(long = "header-marker", value_name = "TEXT")]
    pub header_marker: Option<String>,

    /// TOML file with analysis settings; flags override its values
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print a per-configuration phase summary to stderr
    #[arg(short = 's', long = "summary")]
    pub summary: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Defaults, then the config file, then explicit flags
    pub fn resolve_config(&self) -> PhaseTimesResult<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(bins) = self.bins {
            config.bins = bins;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(marker) = &self.header_marker {
            config.header_marker = marker.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhaseTimesError;
    use std::io::Write;

    #[test]
    fn test_cli_no_arguments_reads_stdin() {
        let cli = Cli::parse_from(["phase-times"]);
        assert!(cli.input.is_none());
        assert!(!cli.summary);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_input_path() {
        let cli = Cli::parse_from(["phase-times", "build.log"]);
        assert_eq!(cli.input, Some(PathBuf::from("build.log")));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["phase-times", "-o", "out", "-b", "10", "-s", "log.txt"]);
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.bins, Some(10));
        assert!(cli.summary);
    }

    #[test]
    fn test_cli_format_json() {
        let cli = Cli::parse_from(["phase-times", "--format", "json"]);
        assert_eq!(cli.format, Some(ReportFormat::Json));
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["phase-times", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_resolve_defaults() {
        let cli = Cli::parse_from(["phase-times"]);
        assert_eq!(cli.resolve_config().unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn test_cli_resolve_flag_overrides() {
        let cli = Cli::parse_from([
            "phase-times",
            "--bins",
            "7",
            "--header-marker",
            "time=1",
            "--format",
            "json",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.bins, 7);
        assert_eq!(config.header_marker, "time=1");
        assert_eq!(config.format, ReportFormat::Json);
    }

    #[test]
    fn test_cli_resolve_zero_bins_rejected() {
        let cli = Cli::parse_from(["phase-times", "--bins", "0"]);
        assert!(matches!(
            cli.resolve_config().unwrap_err(),
            PhaseTimesError::Config(_)
        ));
    }

    #[test]
    fn test_cli_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bins = 20\noutput_dir = \"from-file\"").unwrap();

        let path = file.path().to_str().unwrap();
        let cli = Cli::parse_from(["phase-times", "--config", path, "-b", "5"]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.bins, 5);
        assert_eq!(config.output_dir, PathBuf::from("from-file"));
    }
}
