//! Binned phase timing reports
//!
//! One report per configuration. Each bin row holds, per phase, the bin's
//! summed phase time divided by the bin's recomputed median, so a phase whose
//! ratio climbs from the small-compilation rows to the large ones scales
//! worse than the typical phase.

use crate::binning::BinnedProfile;
use crate::error::{PhaseTimesError, PhaseTimesResult};
use crate::phase_index::PhaseIndex;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Report file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Comma-separated values, one file per configuration (default)
    #[default]
    Csv,
    /// Structured JSON document, one file per configuration
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

/// One populated bin as it appears in the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub lo: usize,
    pub hi: usize,
    pub phase_sums: Vec<u64>,
    pub total: u64,
    pub median: u64,
    pub median_sum: u64,
}

impl ReportRow {
    pub fn label(&self) -> String {
        format!("[{},{})", self.lo, self.hi)
    }

    /// Bin phase sum over bin median; non-finite when the median is zero
    pub fn ratio(&self, phase: usize) -> f64 {
        self.phase_sums[phase] as f64 / self.median as f64
    }
}

/// Normalized report for one configuration
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub configuration: String,
    pub phases: Vec<String>,
    pub rows: Vec<ReportRow>,
    pub phase_totals: Vec<u64>,
    pub grand_total: u64,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    range: [usize; 2],
    ratios: Vec<Option<f64>>,
    phase_sums: &'a [u64],
    total: u64,
    median: u64,
    median_sum: u64,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    configuration: &'a str,
    title: String,
    phases: &'a [String],
    rows: Vec<JsonRow<'a>>,
    phase_totals: &'a [u64],
    grand_total: u64,
}

impl PhaseReport {
    /// Build the report rows for a binned configuration
    pub fn from_bins(binned: &BinnedProfile, phases: &PhaseIndex) -> PhaseTimesResult<Self> {
        let overflow =
            || PhaseTimesError::overflow(format!("configuration {} totals", binned.configuration));
        let phase_names: Vec<String> = phases.names().map(str::to_string).collect();
        let phase_count = phase_names.len();
        let mut phase_totals = vec![0u64; phase_count];
        let mut rows = Vec::with_capacity(binned.bins.len());

        for bin in &binned.bins {
            let phase_sums: Vec<u64> = (0..phase_count).map(|i| bin.times.phase(i)).collect();
            for (total, sum) in phase_totals.iter_mut().zip(&phase_sums) {
                *total = total.checked_add(*sum).ok_or_else(overflow)?;
            }
            rows.push(ReportRow {
                lo: bin.ranks.start,
                hi: bin.ranks.end,
                phase_sums,
                total: bin.times.total(),
                median: bin.times.median(),
                median_sum: bin.median_sum,
            });
        }

        let grand_total = phase_totals
            .iter()
            .try_fold(0u64, |acc, t| acc.checked_add(*t))
            .ok_or_else(overflow)?;

        Ok(Self {
            configuration: binned.configuration.clone(),
            phases: phase_names,
            rows,
            phase_totals,
            grand_total,
        })
    }

    pub fn title(&self) -> String {
        format!(
            "{}:Binned compilation phase timing profiles, bin total of phase times / bin total of per-compilation median phase times",
            self.configuration
        )
    }

    /// Write the CSV form: header, one row per bin, then the totals row
    pub fn write_csv<W: Write>(&self, writer: W) -> PhaseTimesResult<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        let mut header = Vec::with_capacity(self.phases.len() + 2);
        header.push(self.title());
        header.extend(self.phases.iter().cloned());
        header.push("TOTAL (ns)".to_string());
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(self.phases.len() + 2);
            record.push(row.label());
            record.extend((0..self.phases.len()).map(|i| format_ratio(row.ratio(i))));
            record.push(format!("{:5.2}", row.total as f64));
            wtr.write_record(&record)?;
        }

        let mut totals = Vec::with_capacity(self.phases.len() + 2);
        totals.push("PHASE TOTALS (ns)".to_string());
        totals.extend(self.phase_totals.iter().map(u64::to_string));
        totals.push(self.grand_total.to_string());
        wtr.write_record(&totals)?;

        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Write the JSON form; non-finite ratios become `null`
    pub fn write_json<W: Write>(&self, writer: W) -> PhaseTimesResult<()> {
        let rows = self
            .rows
            .iter()
            .map(|row| JsonRow {
                range: [row.lo, row.hi],
                ratios: (0..self.phases.len())
                    .map(|i| Some(row.ratio(i)).filter(|r| r.is_finite()))
                    .collect(),
                phase_sums: &row.phase_sums,
                total: row.total,
                median: row.median,
                median_sum: row.median_sum,
            })
            .collect();

        let doc = JsonReport {
            configuration: &self.configuration,
            title: self.title(),
            phases: &self.phases,
            rows,
            phase_totals: &self.phase_totals,
            grand_total: self.grand_total,
        };
        serde_json::to_writer_pretty(writer, &doc)?;
        Ok(())
    }

    /// Write `<configuration>.<ext>` into `dir`, replacing any existing file
    pub fn write_to_dir(&self, dir: &Path, format: ReportFormat) -> PhaseTimesResult<PathBuf> {
        let path = dir.join(format!("{}.{}", self.configuration, format.extension()));
        let file = File::create(&path).map_err(|e| PhaseTimesError::io(&path, e))?;
        let mut out = BufWriter::new(file);
        match format {
            ReportFormat::Csv => self.write_csv(&mut out)?,
            ReportFormat::Json => self.write_json(&mut out)?,
        }
        out.flush().map_err(|e| PhaseTimesError::io(&path, e))?;
        Ok(path)
    }
}

/// Format a normalized ratio as a width-5, two-decimal cell.
///
/// A zero bin median yields `NaN` (nothing over nothing) or `+Inf`.
pub fn format_ratio(ratio: f64) -> String {
    if ratio.is_nan() {
        format!("{:>5}", "NaN")
    } else if ratio.is_infinite() {
        format!("{:>5}", if ratio > 0.0 { "+Inf" } else { "-Inf" })
    } else {
        format!("{ratio:5.2}")
    }
}
