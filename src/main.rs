use anyhow::{Context, Result};
use clap::Parser;
use phase_times::{analyzer::PhaseTimesAnalyzer, cli::Cli, summary::Summary};
use std::fs::File;
use std::io::{self, BufReader};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` turns on everything, otherwise
/// only `RUST_LOG` directives apply
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = args
        .resolve_config()
        .context("invalid analysis configuration")?;
    let mut analyzer = PhaseTimesAnalyzer::new(config);

    match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            analyzer
                .ingest(BufReader::new(file))
                .with_context(|| format!("failed to parse {}", path.display()))?;
        }
        None => {
            analyzer
                .ingest(io::stdin().lock())
                .context("failed to parse standard input")?;
        }
    }

    let analysis = analyzer.finish();
    let written = analysis
        .write_reports()
        .context("failed to write reports")?;

    if args.summary {
        for report in &written {
            eprint!("{}", Summary::new(&report.report, report.compilations));
            eprintln!("wrote {}", report.path.display());
            eprintln!();
        }
    }

    Ok(())
}
