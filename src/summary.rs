// Per-configuration summary table, printed to stderr with `-s`

use crate::report::PhaseReport;
use std::fmt;

const RULE: &str = "------ ----------- ----------- ----------------";

/// Summary of one report in strace `-c` layout.
///
/// Phases are listed by their share of the configuration's total time,
/// largest first. `peak` is the largest finite normalized ratio any bin
/// reached for that phase.
#[derive(Debug, Clone, Copy)]
pub struct Summary<'a> {
    report: &'a PhaseReport,
    compilations: usize,
}

impl<'a> Summary<'a> {
    pub fn new(report: &'a PhaseReport, compilations: usize) -> Self {
        Self {
            report,
            compilations,
        }
    }

    fn peak(&self, phase: usize) -> Option<f64> {
        self.report
            .rows
            .iter()
            .map(|row| row.ratio(phase))
            .filter(|r| r.is_finite())
            .reduce(f64::max)
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let zero_median_bins = report.rows.iter().filter(|r| r.median == 0).count();

        writeln!(
            f,
            "{}: {} compilations in {} bins ({} with zero median)",
            report.configuration,
            self.compilations,
            report.rows.len(),
            zero_median_bins
        )?;

        if report.phases.is_empty() || report.grand_total == 0 {
            return writeln!(f, "No phase times recorded.");
        }

        let mut order: Vec<usize> = (0..report.phases.len()).collect();
        order.sort_by(|&a, &b| report.phase_totals[b].cmp(&report.phase_totals[a]));

        writeln!(f, "% time     seconds        peak phase")?;
        writeln!(f, "{RULE}")?;

        for i in order {
            let nanos = report.phase_totals[i];
            let percent = nanos as f64 / report.grand_total as f64 * 100.0;
            let peak = match self.peak(i) {
                Some(p) => format!("{p:.2}"),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "{:6.2} {:>11.6} {:>11} {}",
                percent,
                nanos as f64 / 1e9,
                peak,
                report.phases[i]
            )?;
        }

        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "100.00 {:>11.6} {:>11} total",
            report.grand_total as f64 / 1e9,
            ""
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportRow;

    fn report() -> PhaseReport {
        PhaseReport {
            configuration: "Base".to_string(),
            phases: vec!["opt".to_string(), "lower".to_string(), "regalloc".to_string()],
            rows: vec![
                ReportRow {
                    lo: 0,
                    hi: 2,
                    phase_sums: vec![10, 20, 40],
                    total: 70,
                    median: 20,
                    median_sum: 5,
                },
                ReportRow {
                    lo: 2,
                    hi: 3,
                    phase_sums: vec![0, 0, 9],
                    total: 9,
                    median: 0,
                    median_sum: 0,
                },
            ],
            phase_totals: vec![10, 20, 49],
            grand_total: 79,
        }
    }

    #[test]
    fn test_summary_header_line() {
        let text = Summary::new(&report(), 3).to_string();
        assert!(text.starts_with("Base: 3 compilations in 2 bins (1 with zero median)\n"));
    }

    #[test]
    fn test_summary_sorted_by_time() {
        let text = Summary::new(&report(), 3).to_string();
        let phases: Vec<&str> = text
            .lines()
            .skip(3)
            .take(3)
            .filter_map(|l| l.split_whitespace().last())
            .collect();
        assert_eq!(phases, vec!["regalloc", "lower", "opt"]);
    }

    #[test]
    fn test_summary_peak_skips_non_finite() {
        let text = Summary::new(&report(), 3).to_string();
        let regalloc = text.lines().find(|l| l.ends_with(" regalloc")).unwrap();
        // 40/20 in the first bin; 9/0 is not finite
        assert!(regalloc.contains(" 2.00 "));
    }

    #[test]
    fn test_summary_total_row() {
        let text = Summary::new(&report(), 3).to_string();
        let last = text.lines().last().unwrap();
        assert!(last.starts_with("100.00"));
        assert!(last.ends_with("total"));
    }

    #[test]
    fn test_summary_empty_report() {
        let empty = PhaseReport {
            configuration: "Empty".to_string(),
            phases: Vec::new(),
            rows: Vec::new(),
            phase_totals: Vec::new(),
            grand_total: 0,
        };
        let text = Summary::new(&empty, 0).to_string();
        assert!(text.contains("No phase times recorded."));
    }
}
