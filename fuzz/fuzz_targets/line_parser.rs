#![no_main]

use libfuzzer_sys::fuzz_target;
use phase_times::analyzer::PhaseTimesAnalyzer;
use phase_times::config::AnalysisConfig;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a build log: every line must parse or fail cleanly
    let mut analyzer = PhaseTimesAnalyzer::new(AnalysisConfig::default());
    if analyzer.ingest(data).is_ok() {
        let analysis = analyzer.finish();
        for report in analysis.reports().flatten() {
            let mut sink = Vec::new();
            let _ = report.write_csv(&mut sink);
        }
    }
});
