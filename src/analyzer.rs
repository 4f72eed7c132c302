//! Pipeline driver: parse the whole log, freeze medians, then bin and write
//! one report per configuration
//!
//! # Example
//!
//! ```
//! use phase_times::analyzer::PhaseTimesAnalyzer;
//! use phase_times::config::AnalysisConfig;
//!
//! let log = "\
//! (cd /w/p; GOPATH=/w/gopath GOROOT=/w/goroots/Base go build -gcflags=all=-d=ssa/all/time=1 .)
//! # example.com/p
//! p.go:3:6\topt\tTIME(ns)\t1200\tmain
//! p.go:3:6\tlower\tTIME(ns)\t800\tmain
//! ";
//!
//! let mut analyzer = PhaseTimesAnalyzer::new(AnalysisConfig::default());
//! analyzer.ingest(log.as_bytes()).unwrap();
//! let analysis = analyzer.finish();
//!
//! let reports: Vec<_> = analysis.reports().collect::<Result<_, _>>().unwrap();
//! assert_eq!(reports.len(), 1);
//! assert_eq!(reports[0].configuration, "Base");
//! assert_eq!(reports[0].grand_total, 2000);
//! ```

use crate::aggregate::{Aggregator, ConfigurationProfile};
use crate::binning::{bin_profile, BinnedProfile};
use crate::config::AnalysisConfig;
use crate::error::{PhaseTimesError, PhaseTimesResult};
use crate::intern::Interner;
use crate::parser::{LineEvent, LineParser};
use crate::phase_index::PhaseIndex;
use crate::report::PhaseReport;
use std::io::BufRead;
use std::path::PathBuf;

/// Collects phase timings from a build log
#[derive(Debug)]
pub struct PhaseTimesAnalyzer {
    config: AnalysisConfig,
    interner: Interner,
    phases: PhaseIndex,
    parser: LineParser,
    aggregator: Aggregator,
    timing_lines: usize,
    duplicate_timings: usize,
}

impl PhaseTimesAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        let parser = LineParser::new(config.header_marker.clone());
        Self {
            config,
            interner: Interner::new(),
            phases: PhaseIndex::new(),
            parser,
            aggregator: Aggregator::new(),
            timing_lines: 0,
            duplicate_timings: 0,
        }
    }

    /// Feed one line of the build log
    pub fn ingest_line(&mut self, line: &str) -> PhaseTimesResult<()> {
        match self
            .parser
            .parse_line(line, &mut self.interner, &mut self.phases)?
        {
            LineEvent::Configuration(name) => {
                self.aggregator.open(name);
            }
            LineEvent::Timing(timing) => {
                self.timing_lines += 1;
                let phase_count = self.phases.next_index();
                let line = self.parser.line_number();
                let stored = self
                    .aggregator
                    .open(timing.configuration)
                    .record(timing.key, timing.phase, timing.nanos, phase_count)
                    .map_err(|_| PhaseTimesError::overflow(format!("line {line}")))?;
                if !stored && timing.nanos != 0 {
                    self.duplicate_timings += 1;
                    tracing::trace!(line, "duplicate phase timing ignored");
                }
            }
            LineEvent::Package(_) | LineEvent::Ignored => {}
        }
        Ok(())
    }

    /// Feed every line of `reader`; stops at the first error
    pub fn ingest<R: BufRead>(&mut self, reader: R) -> PhaseTimesResult<()> {
        for line in reader.lines() {
            let line = line.map_err(|source| PhaseTimesError::Read {
                line: self.parser.line_number() + 1,
                source,
            })?;
            self.ingest_line(&line)?;
        }

        tracing::info!(
            lines = self.parser.line_number(),
            timing_lines = self.timing_lines,
            duplicates = self.duplicate_timings,
            configurations = self.aggregator.configurations().len(),
            phases = self.phases.next_index(),
            interned = self.interner.len(),
            "ingested build log"
        );
        Ok(())
    }

    /// End of input: compute every compilation's median
    pub fn finish(mut self) -> Analysis {
        self.aggregator.freeze();
        Analysis {
            config: self.config,
            phases: self.phases,
            aggregator: self.aggregator,
        }
    }
}

/// A report that has been written to disk
#[derive(Debug, Clone)]
pub struct WrittenReport {
    pub path: PathBuf,
    pub compilations: usize,
    pub report: PhaseReport,
}

/// Frozen aggregates, ready for binning and reporting
#[derive(Debug)]
pub struct Analysis {
    config: AnalysisConfig,
    phases: PhaseIndex,
    aggregator: Aggregator,
}

impl Analysis {
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn phases(&self) -> &PhaseIndex {
        &self.phases
    }

    /// Configurations in first-seen order
    pub fn configurations(&self) -> &[ConfigurationProfile] {
        self.aggregator.configurations()
    }

    pub fn configuration(&self, name: &str) -> Option<&ConfigurationProfile> {
        self.aggregator.get(name)
    }

    pub fn bin(&self, profile: &ConfigurationProfile) -> PhaseTimesResult<BinnedProfile> {
        bin_profile(profile, self.config.bins, self.phases.next_index())
    }

    pub fn report(&self, profile: &ConfigurationProfile) -> PhaseTimesResult<PhaseReport> {
        PhaseReport::from_bins(&self.bin(profile)?, &self.phases)
    }

    /// One report per configuration, binned on demand
    pub fn reports(&self) -> impl Iterator<Item = PhaseTimesResult<PhaseReport>> + '_ {
        self.configurations()
            .iter()
            .map(|profile| self.report(profile))
    }

    /// Bin and write each configuration in turn.
    ///
    /// A failure stops the run; reports already written are left in place.
    pub fn write_reports(&self) -> PhaseTimesResult<Vec<WrittenReport>> {
        let dir = &self.config.output_dir;
        let mut written = Vec::with_capacity(self.configurations().len());
        for profile in self.configurations() {
            let report = self.report(profile)?;
            let path = report.write_to_dir(dir, self.config.format)?;
            tracing::info!(
                configuration = profile.name(),
                compilations = profile.len(),
                bins = report.rows.len(),
                path = %path.display(),
                "wrote report"
            );
            written.push(WrittenReport {
                path,
                compilations: profile.len(),
                report,
            });
        }
        Ok(written)
    }
}
